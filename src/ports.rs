//! Persistence ports for transactions and bank accounts on file.
//! The lifecycle engine depends only on `TransactionRepository`.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::{BankAccount, NewTransaction, StoredBankAccount, Transaction};

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Persists a new record in `init` and assigns its id.
    async fn create(&self, tx: &NewTransaction) -> RepositoryResult<Transaction>;

    /// Overwrites the stored record with the same id.
    async fn save(&self, tx: &Transaction) -> RepositoryResult<()>;

    async fn find(&self, id: i64) -> RepositoryResult<Transaction>;

    /// Removes a record. Transactions referencing it keep existing with
    /// their reference cleared.
    async fn delete(&self, id: i64) -> RepositoryResult<()>;

    /// Transactions whose reference points at `id`.
    async fn list_referencing(&self, id: i64) -> RepositoryResult<Vec<Transaction>>;

    /// Transactions stuck before `completed`, or charged but not marked processed.
    async fn list_unresolved(&self) -> RepositoryResult<Vec<Transaction>>;
}

#[async_trait]
pub trait BankAccountRepository: Send + Sync {
    async fn create(&self, account: &BankAccount) -> RepositoryResult<StoredBankAccount>;

    async fn find(&self, id: i64) -> RepositoryResult<StoredBankAccount>;

    /// All accounts, ordered by name, BSB and then account number.
    async fn list(&self) -> RepositoryResult<Vec<StoredBankAccount>>;

    async fn delete(&self, id: i64) -> RepositoryResult<()>;
}
