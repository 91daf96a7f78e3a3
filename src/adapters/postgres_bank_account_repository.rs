//! Postgres implementation of BankAccountRepository.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::domain::{BankAccount, StoredBankAccount};
use crate::ports::{BankAccountRepository, RepositoryError, RepositoryResult};

#[derive(Clone)]
pub struct PostgresBankAccountRepository {
    pool: PgPool,
}

impl PostgresBankAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BankAccountRepository for PostgresBankAccountRepository {
    async fn create(&self, account: &BankAccount) -> RepositoryResult<StoredBankAccount> {
        let row = sqlx::query_as::<_, BankAccountRow>(
            r#"
            INSERT INTO securepay_bank_accounts (name, bsb, account_number)
            VALUES ($1, $2, $3)
            RETURNING id, name, bsb, account_number
            "#,
        )
        .bind(&account.name)
        .bind(&account.bsb)
        .bind(&account.account_number)
        .fetch_one(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(row.into())
    }

    async fn find(&self, id: i64) -> RepositoryResult<StoredBankAccount> {
        let row = sqlx::query_as::<_, BankAccountRow>(
            "SELECT id, name, bsb, account_number FROM securepay_bank_accounts WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        row.map(StoredBankAccount::from)
            .ok_or_else(|| RepositoryError::NotFound(format!("bank account {}", id)))
    }

    async fn list(&self) -> RepositoryResult<Vec<StoredBankAccount>> {
        // COLLATE "C" keeps the order byte-wise, whatever the database locale.
        let rows = sqlx::query_as::<_, BankAccountRow>(
            r#"
            SELECT id, name, bsb, account_number FROM securepay_bank_accounts
            ORDER BY name COLLATE "C", bsb COLLATE "C", account_number COLLATE "C", id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        Ok(rows.into_iter().map(StoredBankAccount::from).collect())
    }

    async fn delete(&self, id: i64) -> RepositoryResult<()> {
        let result = sqlx::query("DELETE FROM securepay_bank_accounts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(RepositoryError::from)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("bank account {}", id)));
        }
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct BankAccountRow {
    id: i64,
    name: String,
    bsb: String,
    account_number: String,
}

impl From<BankAccountRow> for StoredBankAccount {
    fn from(row: BankAccountRow) -> Self {
        StoredBankAccount {
            id: row.id,
            account: BankAccount::new(row.name, row.bsb, row.account_number),
        }
    }
}
