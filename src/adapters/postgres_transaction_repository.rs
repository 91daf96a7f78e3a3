//! Postgres implementation of TransactionRepository.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{NewTransaction, Transaction, TriState, TxnStatus, TxnType};
use crate::ports::{RepositoryError, RepositoryResult, TransactionRepository};

const COLUMNS: &str = r#"
    id, created_at, updated_at, purchase_order_no, card_name, txn_type, amount,
    description, extra_data, status, processed, success, response_text, response_code,
    bank_message, reference_transaction_id, txn_id, preauth_id, debug
"#;

/// Postgres-backed transaction repository.
#[derive(Clone)]
pub struct PostgresTransactionRepository {
    pool: PgPool,
}

impl PostgresTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn create(&self, tx: &NewTransaction) -> RepositoryResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            INSERT INTO securepay_transactions (
                purchase_order_no, card_name, txn_type, amount, description,
                extra_data, status, reference_transaction_id, debug
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(&tx.purchase_order_no)
        .bind(&tx.card_name)
        .bind(tx.txn_type.as_str())
        .bind(&tx.amount)
        .bind(&tx.description)
        .bind(&tx.extra_data)
        .bind(TxnStatus::Init.as_str())
        .bind(tx.reference_transaction_id)
        .bind(tx.debug)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.into_domain()
    }

    async fn save(&self, tx: &Transaction) -> RepositoryResult<()> {
        // Business fields and the reference are fixed at creation.
        let result = sqlx::query(
            r#"
            UPDATE securepay_transactions SET
                updated_at = NOW(),
                purchase_order_no = $2,
                status = $3,
                processed = $4,
                success = $5,
                response_text = $6,
                response_code = $7,
                bank_message = $8,
                txn_id = $9,
                preauth_id = $10
            WHERE id = $1
            "#,
        )
        .bind(tx.id)
        .bind(&tx.purchase_order_no)
        .bind(tx.status.as_str())
        .bind(Option::<bool>::from(tx.processed))
        .bind(Option::<bool>::from(tx.success))
        .bind(&tx.response_text)
        .bind(&tx.response_code)
        .bind(&tx.bank_message)
        .bind(&tx.txn_id)
        .bind(&tx.preauth_id)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(tx.id.to_string()));
        }
        Ok(())
    }

    async fn find(&self, id: i64) -> RepositoryResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {COLUMNS} FROM securepay_transactions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.ok_or_else(|| RepositoryError::NotFound(id.to_string()))?
            .into_domain()
    }

    async fn delete(&self, id: i64) -> RepositoryResult<()> {
        // The foreign key is ON DELETE SET NULL, so referencing rows survive.
        let result = sqlx::query("DELETE FROM securepay_transactions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn list_referencing(&self, id: i64) -> RepositoryResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {COLUMNS} FROM securepay_transactions WHERE reference_transaction_id = $1 ORDER BY id"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        rows.into_iter().map(TransactionRow::into_domain).collect()
    }

    async fn list_unresolved(&self) -> RepositoryResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            SELECT {COLUMNS} FROM securepay_transactions
            WHERE status <> 'completed'
               OR (success IS TRUE AND processed IS NOT TRUE)
            ORDER BY id DESC
            "#
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        rows.into_iter().map(TransactionRow::into_domain).collect()
    }
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: i64,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
    purchase_order_no: String,
    card_name: String,
    txn_type: String,
    amount: bigdecimal::BigDecimal,
    description: String,
    extra_data: serde_json::Value,
    status: String,
    processed: Option<bool>,
    success: Option<bool>,
    response_text: String,
    response_code: String,
    bank_message: String,
    reference_transaction_id: Option<i64>,
    txn_id: Option<String>,
    preauth_id: Option<String>,
    debug: bool,
}

impl TransactionRow {
    fn into_domain(self) -> RepositoryResult<Transaction> {
        let txn_type = self
            .txn_type
            .parse::<TxnType>()
            .map_err(|e| RepositoryError::Corrupt(format!("transaction {}: {}", self.id, e)))?;
        let status = self
            .status
            .parse::<TxnStatus>()
            .map_err(|e| RepositoryError::Corrupt(format!("transaction {}: {}", self.id, e)))?;

        Ok(Transaction {
            id: self.id,
            created_at: self.created_at,
            updated_at: self.updated_at,
            purchase_order_no: self.purchase_order_no,
            card_name: self.card_name,
            txn_type,
            amount: self.amount,
            description: self.description,
            extra_data: self.extra_data,
            status,
            processed: TriState::from(self.processed),
            success: TriState::from(self.success),
            response_text: self.response_text,
            response_code: self.response_code,
            bank_message: self.bank_message,
            reference_transaction_id: self.reference_transaction_id,
            txn_id: self.txn_id,
            preauth_id: self.preauth_id,
            debug: self.debug,
        })
    }
}
