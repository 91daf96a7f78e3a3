pub mod memory_bank_account_repository;
pub mod memory_transaction_repository;
pub mod postgres_bank_account_repository;
pub mod postgres_transaction_repository;

pub use memory_bank_account_repository::InMemoryBankAccountRepository;
pub use memory_transaction_repository::InMemoryTransactionRepository;
pub use postgres_bank_account_repository::PostgresBankAccountRepository;
pub use postgres_transaction_repository::PostgresTransactionRepository;
