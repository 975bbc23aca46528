use async_trait::async_trait;
use common::{DomainError, UserId};
use sqlx::PgPool;

use crate::domain::entities::User;
use crate::domain::repository::UserRepository;
use crate::infrastructure::persistence::map_db_err;
use crate::infrastructure::persistence::models::UserModel;

pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DomainError> {
        let model_opt = sqlx::query_as::<_, UserModel>(r#"SELECT * FROM users WHERE id = $1"#)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;

        model_opt.map(UserModel::into_entity).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let model_opt = sqlx::query_as::<_, UserModel>(r#"SELECT * FROM users WHERE email = $1"#)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;

        model_opt.map(UserModel::into_entity).transpose()
    }

    async fn create(&self, user: &User) -> Result<(), DomainError> {
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
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if e.to_string().contains("users_email_key") {
                DomainError::conflict(format!("email {} already registered", user.email()))
            } else {
                map_db_err(e)
            }
        })?;

        Ok(())
    }

    async fn update(&self, user: &User) -> Result<(), DomainError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE users
            SET kyc_status = $1, active = $2, is_staff = $3, kyc_submitted_at = $4, kyc_verified_at = $5
            WHERE id = $6
            "#,
        )
        .bind(user.kyc_status())
        .bind(user.active())
        .bind(user.is_staff())
        .bind(user.kyc_submitted_at())
        .bind(user.kyc_verified_at())
        .bind(user.id())
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?
        .rows_affected();

        if rows_affected == 0 {
            return Err(DomainError::not_found(format!("user {}", user.id())));
        }
        Ok(())
    }
}
