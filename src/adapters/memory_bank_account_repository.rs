//! In-memory implementation of BankAccountRepository.

use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::domain::{BankAccount, StoredBankAccount};
use crate::ports::{BankAccountRepository, RepositoryError, RepositoryResult};

#[derive(Default)]
struct Rows {
    last_id: i64,
    rows: BTreeMap<i64, BankAccount>,
}

#[derive(Default)]
pub struct InMemoryBankAccountRepository {
    inner: RwLock<Rows>,
}

impl InMemoryBankAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BankAccountRepository for InMemoryBankAccountRepository {
    async fn create(&self, account: &BankAccount) -> RepositoryResult<StoredBankAccount> {
        let mut inner = self.inner.write().await;
        inner.last_id += 1;
        let id = inner.last_id;
        inner.rows.insert(id, account.clone());
        Ok(StoredBankAccount {
            id,
            account: account.clone(),
        })
    }

    async fn find(&self, id: i64) -> RepositoryResult<StoredBankAccount> {
        self.inner
            .read()
            .await
            .rows
            .get(&id)
            .map(|account| StoredBankAccount {
                id,
                account: account.clone(),
            })
            .ok_or_else(|| RepositoryError::NotFound(format!("bank account {}", id)))
    }

    async fn list(&self) -> RepositoryResult<Vec<StoredBankAccount>> {
        let mut accounts: Vec<StoredBankAccount> = self
            .inner
            .read()
            .await
            .rows
            .iter()
            .map(|(id, account)| StoredBankAccount {
                id: *id,
                account: account.clone(),
            })
            .collect();

        // Ties fall back to id, matching the Postgres adapter.
        accounts.sort_by(|a, b| {
            (&a.account.name, &a.account.bsb, &a.account.account_number, a.id).cmp(&(
                &b.account.name,
                &b.account.bsb,
                &b.account.account_number,
                b.id,
            ))
        });
        Ok(accounts)
    }

    async fn delete(&self, id: i64) -> RepositoryResult<()> {
        self.inner
            .write()
            .await
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(format!("bank account {}", id)))
    }
}
