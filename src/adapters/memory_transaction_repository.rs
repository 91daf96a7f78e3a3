//! In-memory implementation of TransactionRepository.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

use crate::domain::{NewTransaction, Transaction};
use crate::ports::{RepositoryError, RepositoryResult, TransactionRepository};

#[derive(Default)]
struct Rows {
    last_id: i64,
    rows: BTreeMap<i64, Transaction>,
}

/// Process-local transaction store with sequential ids.
#[derive(Default)]
pub struct InMemoryTransactionRepository {
    inner: RwLock<Rows>,
}

impl InMemoryTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.rows.is_empty()
    }
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn create(&self, tx: &NewTransaction) -> RepositoryResult<Transaction> {
        let mut inner = self.inner.write().await;
        inner.last_id += 1;
        let created = Transaction::from_new(inner.last_id, tx.clone());
        inner.rows.insert(created.id, created.clone());
        Ok(created)
    }

    async fn save(&self, tx: &Transaction) -> RepositoryResult<()> {
        let mut inner = self.inner.write().await;
        let row = inner
            .rows
            .get_mut(&tx.id)
            .ok_or_else(|| RepositoryError::NotFound(tx.id.to_string()))?;

        // Business fields and the reference are fixed at creation.
        row.purchase_order_no = tx.purchase_order_no.clone();
        row.status = tx.status;
        row.processed = tx.processed;
        row.success = tx.success;
        row.response_text = tx.response_text.clone();
        row.response_code = tx.response_code.clone();
        row.bank_message = tx.bank_message.clone();
        row.txn_id = tx.txn_id.clone();
        row.preauth_id = tx.preauth_id.clone();
        row.updated_at = Utc::now();
        Ok(())
    }

    async fn find(&self, id: i64) -> RepositoryResult<Transaction> {
        self.inner
            .read()
            .await
            .rows
            .get(&id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))
    }

    async fn delete(&self, id: i64) -> RepositoryResult<()> {
        let mut inner = self.inner.write().await;
        inner
            .rows
            .remove(&id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;

        for row in inner.rows.values_mut() {
            if row.reference_transaction_id == Some(id) {
                row.reference_transaction_id = None;
            }
        }
        Ok(())
    }

    async fn list_referencing(&self, id: i64) -> RepositoryResult<Vec<Transaction>> {
        Ok(self
            .inner
            .read()
            .await
            .rows
            .values()
            .filter(|row| row.reference_transaction_id == Some(id))
            .cloned()
            .collect())
    }

    async fn list_unresolved(&self) -> RepositoryResult<Vec<Transaction>> {
        Ok(self
            .inner
            .read()
            .await
            .rows
            .values()
            .rev()
            .filter(|row| row.needs_review() || row.is_unfulfilled())
            .cloned()
            .collect())
    }
}
