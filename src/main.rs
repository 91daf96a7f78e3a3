use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use securepay_core::cli::{self, BankAccountCommands, Cli, Commands, DbCommands, TxCommands};
use securepay_core::domain::BankAccount;
use securepay_core::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Setup logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Config => cli::handle_config_validate(&config),
        Commands::Db(DbCommands::Migrate) => cli::handle_db_migrate(&config).await,
        Commands::Echo => {
            let engine = cli::build_echo_engine(&config)?;
            cli::handle_echo(&engine, &config).await
        }
        Commands::BankAccount(command) => {
            let repository = cli::build_bank_account_repository(&config).await?;
            match command {
                BankAccountCommands::List { json } => {
                    cli::handle_bank_account_list(repository.as_ref(), json).await
                }
                BankAccountCommands::Add {
                    name,
                    bsb,
                    account_number,
                } => {
                    let account = BankAccount::new(name, bsb, account_number);
                    cli::handle_bank_account_add(repository.as_ref(), account).await
                }
                BankAccountCommands::Remove { id } => {
                    cli::handle_bank_account_remove(repository.as_ref(), id).await
                }
            }
        }
        Commands::Tx(command) => {
            let (engine, repository) = cli::build_engine(&config).await?;
            match command {
                TxCommands::Show { tx_id, json } => {
                    cli::handle_tx_show(repository.as_ref(), tx_id, json).await
                }
                TxCommands::Unresolved { json } => {
                    cli::handle_tx_unresolved(repository.as_ref(), json).await
                }
                TxCommands::Dependents { tx_id } => {
                    cli::handle_tx_dependents(repository.as_ref(), tx_id).await
                }
                TxCommands::MarkProcessed { tx_id, processed } => {
                    cli::handle_tx_mark_processed(&engine, tx_id, processed).await
                }
            }
        }
    }
}
