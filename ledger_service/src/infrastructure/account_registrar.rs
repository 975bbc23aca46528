use async_trait::async_trait;
use common::DomainError;
use sqlx::PgPool;

use crate::domain::entities::{User, Wallet};
use crate::domain::repository::AccountRegistrar;
use crate::infrastructure::persistence::map_db_err;

/// Inserts the new user row and its zero-balance wallet row in one
/// transaction, replacing the original system's "wallet-on-user-creation
/// signal" (§9).
pub struct PostgresAccountRegistrar {
    pool: PgPool,
}

impl PostgresAccountRegistrar {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRegistrar for PostgresAccountRegistrar {
    #[tracing::instrument(name = "PostgresAccountRegistrar::register", skip(self))]
    async fn register(&self, email: String) -> Result<(User, Wallet), DomainError> {
        let user = User::new(email)?;
        let wallet = Wallet::open(user.id());

        let mut tx = self.pool.begin().await.map_err(map_db_err)?;

        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, kyc_status, active, is_staff, kyc_submitted_at, kyc_verified_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id())
        .bind(user.email())
        .bind(user.kyc_status())
        .bind(user.active())
        .bind(user.is_staff())
        .bind(user.kyc_submitted_at())
        .bind(user.kyc_verified_at())
        .bind(user.created_at())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if e.to_string().contains("users_email_key") {
                DomainError::conflict(format!("email {} already registered", user.email()))
            } else {
                map_db_err(e)
            }
        })?;

        sqlx::query(
            r#"INSERT INTO wallets (id, user_id, balance, updated_at) VALUES ($1, $2, $3, $4)"#,
        )
        .bind(wallet.id())
        .bind(wallet.user_id())
        .bind(wallet.balance())
        .bind(wallet.updated_at())
        .execute(&mut *tx)
        .await
        .map_err(map_db_err)?;

        tx.commit().await.map_err(map_db_err)?;
        Ok((user, wallet))
    }
}
