use clap::{Parser, Subcommand};
use std::sync::Arc;

use crate::config::{mask_password, Config};
use crate::domain::{BankAccount, Transaction};
use crate::ports::{BankAccountRepository, TransactionRepository};
use crate::use_cases::LifecycleEngine;

#[derive(Parser)]
#[command(name = "securepay")]
#[command(about = "SecurePay gateway client - payments, refunds and reconciliation", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send an Echo request to check connectivity and credentials
    Echo,

    /// Transaction inspection and reconciliation commands
    #[command(subcommand)]
    Tx(TxCommands),

    /// Bank accounts kept on file for direct entry
    #[command(subcommand)]
    BankAccount(BankAccountCommands),

    /// Database management commands
    #[command(subcommand)]
    Db(DbCommands),

    /// Configuration validation
    Config,
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// Show one transaction
    Show {
        #[arg(value_name = "TX_ID")]
        tx_id: i64,

        /// Print the record as JSON
        #[arg(long)]
        json: bool,
    },

    /// List transactions that are stuck mid-flight or approved but not yet fulfilled
    Unresolved {
        /// Print the records as JSON
        #[arg(long)]
        json: bool,
    },

    /// List transactions that reference the given one (refunds, reversals, completions)
    Dependents {
        #[arg(value_name = "TX_ID")]
        tx_id: i64,
    },

    /// Record whether the goods or service paid for were delivered
    MarkProcessed {
        #[arg(value_name = "TX_ID")]
        tx_id: i64,

        #[arg(value_name = "PROCESSED", action = clap::ArgAction::Set)]
        processed: bool,
    },
}

#[derive(Subcommand)]
pub enum BankAccountCommands {
    /// List accounts ordered by name, BSB and account number
    List {
        /// Print the accounts as JSON
        #[arg(long)]
        json: bool,
    },

    /// Put an account on file
    Add {
        #[arg(value_name = "NAME")]
        name: String,

        #[arg(value_name = "BSB")]
        bsb: String,

        #[arg(value_name = "ACCOUNT_NUMBER")]
        account_number: String,
    },

    /// Remove an account from file
    Remove {
        #[arg(value_name = "ID")]
        id: i64,
    },
}

#[derive(Subcommand)]
pub enum DbCommands {
    /// Run database migrations
    Migrate,
}

pub async fn handle_echo(engine: &LifecycleEngine, config: &Config) -> anyhow::Result<()> {
    let profile = config.profile();
    tracing::info!("Sending echo to {:?} gateway", profile.environment);

    let status = engine.echo(&profile).await?;
    if status.is_normal() {
        println!("✓ Gateway responded: {} {}", status.code, status.description);
        Ok(())
    } else {
        anyhow::bail!("Gateway returned status {} ({})", status.code, status.description)
    }
}

pub async fn handle_tx_show(
    repository: &dyn TransactionRepository,
    tx_id: i64,
    json: bool,
) -> anyhow::Result<()> {
    let tx = repository.find(tx_id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&tx)?);
        return Ok(());
    }

    println!("{}", tx);
    println!("  ID: {}", tx.id);
    println!("  Type: {}", tx.txn_type.label());
    println!("  Status: {}", tx.status.label());
    println!("  Purchase order: {}", tx.purchase_order_no);
    println!("  Amount: {}", tx.amount);
    println!("  Success: {:?}", Option::<bool>::from(tx.success));
    println!("  Processed: {:?}", Option::<bool>::from(tx.processed));
    println!("  Response: {} {}", tx.response_code, tx.bank_message);
    if let Some(txn_id) = &tx.txn_id {
        println!("  Gateway txn ID: {}", txn_id);
    }
    if let Some(preauth_id) = &tx.preauth_id {
        println!("  Preauth ID: {}", preauth_id);
    }
    if let Some(reference) = tx.reference_transaction_id {
        println!("  References: {}", reference);
    }
    if tx.debug {
        println!("  (test gateway)");
    }

    Ok(())
}

pub async fn handle_tx_unresolved(
    repository: &dyn TransactionRepository,
    json: bool,
) -> anyhow::Result<()> {
    let transactions = repository.list_unresolved().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&transactions)?);
        return Ok(());
    }

    if transactions.is_empty() {
        println!("No unresolved transactions");
        return Ok(());
    }

    print_table(&transactions);
    Ok(())
}

pub async fn handle_tx_dependents(
    repository: &dyn TransactionRepository,
    tx_id: i64,
) -> anyhow::Result<()> {
    // Surface a missing transaction as an error rather than an empty list.
    repository.find(tx_id).await?;
    let transactions = repository.list_referencing(tx_id).await?;

    if transactions.is_empty() {
        println!("No transactions reference {}", tx_id);
        return Ok(());
    }

    print_table(&transactions);
    Ok(())
}

pub async fn handle_tx_mark_processed(
    engine: &LifecycleEngine,
    tx_id: i64,
    processed: bool,
) -> anyhow::Result<()> {
    engine.mark_processed(tx_id, processed).await?;
    println!("✓ Transaction {} marked processed={}", tx_id, processed);
    Ok(())
}

pub async fn handle_bank_account_list(
    repository: &dyn BankAccountRepository,
    json: bool,
) -> anyhow::Result<()> {
    let accounts = repository.list().await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&accounts)?);
        return Ok(());
    }

    if accounts.is_empty() {
        println!("No bank accounts on file");
        return Ok(());
    }

    println!("{:<8} {:<32} {:<6} {:<9}", "ID", "Name", "BSB", "Account");
    println!("{}", "-".repeat(58));
    for stored in &accounts {
        println!(
            "{:<8} {:<32} {:<6} {:<9}",
            stored.id, stored.account.name, stored.account.bsb, stored.account.account_number
        );
    }
    Ok(())
}

pub async fn handle_bank_account_add(
    repository: &dyn BankAccountRepository,
    account: BankAccount,
) -> anyhow::Result<()> {
    crate::validation::validate_bank_account(&account)?;
    let stored = repository.create(&account).await?;
    tracing::info!(id = stored.id, "Bank account added");
    println!("✓ Bank account {} added: {}", stored.id, stored);
    Ok(())
}

pub async fn handle_bank_account_remove(
    repository: &dyn BankAccountRepository,
    id: i64,
) -> anyhow::Result<()> {
    repository.delete(id).await?;
    println!("✓ Bank account {} removed", id);
    Ok(())
}

pub async fn handle_db_migrate(config: &Config) -> anyhow::Result<()> {
    let database_url = config
        .database_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required for migrations"))?;
    let pool = crate::db::create_pool(database_url).await?;

    tracing::info!("Running database migrations...");
    crate::db::run_migrations(&pool).await?;
    println!("✓ Database migrations completed");

    Ok(())
}

pub fn handle_config_validate(config: &Config) -> anyhow::Result<()> {
    tracing::info!("Validating configuration...");
    config.validate()?;

    let profile = config.profile();
    println!("Configuration:");
    println!("  Merchant ID: {}", config.merchant_id);
    println!("  Environment: {:?}", profile.environment);
    println!(
        "  Payment endpoint: {}",
        crate::securepay::client::endpoint(&profile, crate::domain::TxnType::Pay)
    );
    println!("  Timeout: {}s", config.timeout_secs);
    match &config.database_url {
        Some(url) => println!("  Database URL: {}", mask_password(url)),
        None => println!("  Database URL: (not set)"),
    }

    tracing::info!("Configuration is valid");
    println!("✓ Configuration is valid");

    Ok(())
}

fn print_table(transactions: &[Transaction]) {
    println!(
        "{:<8} {:<22} {:<10} {:<12} {:<8} {:<10} {:<20}",
        "ID", "Type", "Status", "Amount", "Success", "Processed", "Created"
    );
    println!("{}", "-".repeat(94));

    for tx in transactions {
        println!(
            "{:<8} {:<22} {:<10} {:<12} {:<8} {:<10} {:<20}",
            tx.id,
            tx.txn_type.label(),
            tx.status.as_str(),
            tx.amount.to_string(),
            format_tri(Option::from(tx.success)),
            format_tri(Option::from(tx.processed)),
            tx.created_at.format("%Y-%m-%d %H:%M:%S"),
        );
    }
}

fn format_tri(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "yes",
        Some(false) => "no",
        None => "-",
    }
}

async fn connect(config: &Config) -> anyhow::Result<sqlx::PgPool> {
    let database_url = config
        .database_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required"))?;
    Ok(crate::db::create_pool(database_url).await?)
}

/// Wires the engine to Postgres and the HTTP transport.
pub async fn build_engine(
    config: &Config,
) -> anyhow::Result<(LifecycleEngine, Arc<dyn TransactionRepository>)> {
    use crate::adapters::PostgresTransactionRepository;
    use crate::securepay::HttpTransport;

    let pool = connect(config).await?;

    let repository: Arc<dyn TransactionRepository> =
        Arc::new(PostgresTransactionRepository::new(pool));
    let transport = Arc::new(HttpTransport::new(config.timeout())?);

    Ok((LifecycleEngine::new(repository.clone(), transport), repository))
}

pub async fn build_bank_account_repository(
    config: &Config,
) -> anyhow::Result<Arc<dyn BankAccountRepository>> {
    let pool = connect(config).await?;
    Ok(Arc::new(crate::adapters::PostgresBankAccountRepository::new(pool)))
}

/// Echo stores nothing, so it runs without a database.
pub fn build_echo_engine(config: &Config) -> anyhow::Result<LifecycleEngine> {
    use crate::adapters::InMemoryTransactionRepository;
    use crate::securepay::HttpTransport;

    Ok(LifecycleEngine::new(
        Arc::new(InMemoryTransactionRepository::new()),
        Arc::new(HttpTransport::new(config.timeout())?),
    ))
}
