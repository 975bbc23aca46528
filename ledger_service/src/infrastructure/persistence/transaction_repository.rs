use async_trait::async_trait;
use common::{DomainError, TransactionId, UserId};
use sqlx::PgPool;

use crate::domain::entities::Transaction;
use crate::domain::repository::TransactionRepository;
use crate::infrastructure::persistence::map_db_err;
use crate::infrastructure::persistence::models::TransactionModel;

/// Read-side and idempotency-lookup adapter. `transactions` rows are only
/// ever written from within `PostgresLedgerEngine`'s transactional body.
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
    async fn find_by_id(&self, id: TransactionId) -> Result<Option<Transaction>, DomainError> {
        let model_opt = sqlx::query_as::<_, TransactionModel>(r#"SELECT * FROM transactions WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;

        Ok(model_opt.map(Transaction::from))
    }

    async fn find_by_reference_id(&self, reference_id: &str) -> Result<Option<Transaction>, DomainError> {
        let model_opt = sqlx::query_as::<_, TransactionModel>(
            r#"SELECT * FROM transactions WHERE reference_id = $1"#,
        )
        .bind(reference_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(model_opt.map(Transaction::from))
    }

    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<Transaction>, DomainError> {
        let models = sqlx::query_as::<_, TransactionModel>(
            r#"
            SELECT * FROM transactions
            WHERE from_user_id = $1 OR to_user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(models.into_iter().map(Transaction::from).collect())
    }
}
