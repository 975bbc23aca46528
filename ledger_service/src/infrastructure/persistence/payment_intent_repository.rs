use async_trait::async_trait;
use common::{DomainError, PaymentIntentId};
use sqlx::PgPool;

use crate::domain::entities::PaymentIntent;
use crate::domain::repository::PaymentIntentRepository;
use crate::infrastructure::persistence::map_db_err;
use crate::infrastructure::persistence::models::PaymentIntentModel;

pub struct PostgresPaymentIntentRepository {
    pool: PgPool,
}

impl PostgresPaymentIntentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentIntentRepository for PostgresPaymentIntentRepository {
    async fn find_by_id(&self, id: PaymentIntentId) -> Result<Option<PaymentIntent>, DomainError> {
        let model_opt = sqlx::query_as::<_, PaymentIntentModel>(
            r#"SELECT * FROM payment_intents WHERE id = $1"#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(model_opt.map(PaymentIntent::from))
    }

    async fn find_by_gateway_payment_id(&self, gateway_payment_id: &str) -> Result<Option<PaymentIntent>, DomainError> {
        let model_opt = sqlx::query_as::<_, PaymentIntentModel>(
            r#"SELECT * FROM payment_intents WHERE gateway_payment_id = $1"#,
        )
        .bind(gateway_payment_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(model_opt.map(PaymentIntent::from))
    }

    async fn create(&self, intent: &PaymentIntent) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payment_intents (
                id, gateway_payment_id, user_id, amount, currency, payment_method,
                status, description, metadata, gateway_response, error_message,
                created_at, succeeded_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(intent.id())
        .bind(intent.gateway_payment_id())
        .bind(intent.user_id())
        .bind(intent.amount())
        .bind(intent.currency())
        .bind(intent.payment_method())
        .bind(intent.status())
        .bind(intent.description())
        .bind(intent.metadata())
        .bind(intent.gateway_response())
        .bind(intent.error_message())
        .bind(intent.created_at())
        .bind(intent.succeeded_at())
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(())
    }

    async fn update(&self, intent: &PaymentIntent) -> Result<(), DomainError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE payment_intents
            SET status = $1, error_message = $2, succeeded_at = $3
            WHERE id = $4
            "#,
        )
        .bind(intent.status())
        .bind(intent.error_message())
        .bind(intent.succeeded_at())
        .bind(intent.id())
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?
        .rows_affected();

        if rows_affected == 0 {
            return Err(DomainError::not_found(format!("payment intent {}", intent.id())));
        }
        Ok(())
    }
}
