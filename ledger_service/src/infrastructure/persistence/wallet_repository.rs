use async_trait::async_trait;
use common::{DomainError, UserId, WalletId};
use sqlx::PgPool;

use crate::domain::entities::Wallet;
use crate::domain::repository::WalletRepository;
use crate::infrastructure::persistence::map_db_err;
use crate::infrastructure::persistence::models::WalletModel;

/// Read-only adapter. Balance mutation lives entirely in
/// `infrastructure::ledger_engine::PostgresLedgerEngine` — see the
/// `LedgerEngine` port's doc comment for why.
pub struct PostgresWalletRepository {
    pool: PgPool,
}

impl PostgresWalletRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WalletRepository for PostgresWalletRepository {
    async fn find_by_user_id(&self, user_id: UserId) -> Result<Option<Wallet>, DomainError> {
        let model_opt = sqlx::query_as::<_, WalletModel>(r#"SELECT * FROM wallets WHERE user_id = $1"#)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;

        Ok(model_opt.map(Wallet::from))
    }

    async fn find_by_id(&self, id: WalletId) -> Result<Option<Wallet>, DomainError> {
        let model_opt = sqlx::query_as::<_, WalletModel>(r#"SELECT * FROM wallets WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;

        Ok(model_opt.map(Wallet::from))
    }

    async fn create(&self, wallet: &Wallet) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO wallets (id, user_id, balance, updated_at)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(wallet.id())
        .bind(wallet.user_id())
        .bind(wallet.balance())
        .bind(wallet.updated_at())
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(())
    }
}
