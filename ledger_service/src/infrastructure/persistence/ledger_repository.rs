use async_trait::async_trait;
use common::{DomainError, Money, TransactionId, UserId};
use sqlx::PgPool;

use crate::domain::entities::LedgerEntry;
use crate::domain::repository::LedgerRepository;
use crate::infrastructure::persistence::map_db_err;
use crate::infrastructure::persistence::models::LedgerEntryModel;

/// Read-side adapter over the append-only ledger. Inserts happen only
/// inside `PostgresLedgerEngine`.
pub struct PostgresLedgerRepository {
    pool: PgPool,
}

impl PostgresLedgerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerRepository for PostgresLedgerRepository {
    async fn find_by_transaction_id(&self, transaction_id: TransactionId) -> Result<Vec<LedgerEntry>, DomainError> {
        let models = sqlx::query_as::<_, LedgerEntryModel>(
            r#"SELECT * FROM ledger_entries WHERE transaction_id = $1 ORDER BY created_at ASC"#,
        )
        .bind(transaction_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(models.into_iter().map(LedgerEntry::from).collect())
    }

    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<LedgerEntry>, DomainError> {
        let models = sqlx::query_as::<_, LedgerEntryModel>(
            r#"SELECT * FROM ledger_entries WHERE user_id = $1 ORDER BY created_at DESC"#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(models.into_iter().map(LedgerEntry::from).collect())
    }

    async fn balance_of(&self, user_id: UserId) -> Result<Money, DomainError> {
        let row: (Option<rust_decimal::Decimal>,) = sqlx::query_as(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN entry_type = 'CREDIT' THEN amount ELSE -amount END), 0)
            FROM ledger_entries
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(Money::from_decimal(row.0.unwrap_or_default()))
    }
}
