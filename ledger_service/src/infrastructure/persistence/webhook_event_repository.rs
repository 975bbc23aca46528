use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::DomainError;
use sqlx::PgPool;

use crate::domain::entities::WebhookEvent;
use crate::domain::repository::WebhookEventRepository;
use crate::infrastructure::persistence::map_db_err;
use crate::infrastructure::persistence::models::WebhookEventModel;

pub struct PostgresWebhookEventRepository {
    pool: PgPool,
}

impl PostgresWebhookEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WebhookEventRepository for PostgresWebhookEventRepository {
    async fn find_by_event_id(&self, event_id: &str) -> Result<Option<WebhookEvent>, DomainError> {
        let model_opt = sqlx::query_as::<_, WebhookEventModel>(
            r#"SELECT * FROM webhook_events WHERE event_id = $1"#,
        )
        .bind(event_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(model_opt.map(WebhookEvent::from))
    }

    async fn create_if_absent(&self, event: &WebhookEvent) -> Result<WebhookEvent, DomainError> {
        let inserted = sqlx::query_as::<_, WebhookEventModel>(
            r#"
            INSERT INTO webhook_events (
                id, event_id, event_type, payload, status, error_message, retry_count, created_at,
                processed_at, last_attempt_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (event_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(event.id)
        .bind(&event.event_id)
        .bind(&event.event_type)
        .bind(&event.payload)
        .bind(event.status)
        .bind(&event.error_message)
        .bind(event.retry_count)
        .bind(event.created_at)
        .bind(event.processed_at)
        .bind(event.last_attempt_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_db_err)?;

        if let Some(model) = inserted {
            return Ok(model.into());
        }

        self.find_by_event_id(&event.event_id)
            .await?
            .ok_or_else(|| DomainError::internal("webhook event vanished between insert and re-fetch"))
    }

    async fn update(&self, event: &WebhookEvent) -> Result<(), DomainError> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE webhook_events
            SET status = $1, error_message = $2, retry_count = $3, processed_at = $4, last_attempt_at = $5
            WHERE id = $6
            "#,
        )
        .bind(event.status)
        .bind(&event.error_message)
        .bind(event.retry_count)
        .bind(event.processed_at)
        .bind(event.last_attempt_at)
        .bind(event.id)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?
        .rows_affected();

        if rows_affected == 0 {
            return Err(DomainError::not_found(format!("webhook event {}", event.id)));
        }
        Ok(())
    }

    /// Narrows on status/`retry_count` in SQL, then applies the
    /// exponential-backoff gate (§4.J step 5) in Rust via
    /// `WebhookEvent::is_ready_to_retry` — the window depends on
    /// `2^retry_count`, which is awkward to express portably in SQL.
    async fn find_retryable(
        &self,
        max_retries: i32,
        retry_base_seconds: i64,
        limit: i64,
    ) -> Result<Vec<WebhookEvent>, DomainError> {
        let models = sqlx::query_as::<_, WebhookEventModel>(
            r#"
            SELECT * FROM webhook_events
            WHERE status = 'PENDING' OR (status = 'FAILED' AND retry_count < $1)
            ORDER BY created_at ASC
            LIMIT $2
            "#,
        )
        .bind(max_retries)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(models
            .into_iter()
            .map(WebhookEvent::from)
            .filter(|event| event.is_ready_to_retry(retry_base_seconds))
            .collect())
    }

    async fn delete_processed_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"DELETE FROM webhook_events WHERE status = 'PROCESSED' AND created_at < $1"#,
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(result.rows_affected())
    }
}
