use std::sync::Arc;

use common::DomainError;
use tokio::sync::mpsc::Sender;

use crate::domain::entities::WebhookEvent;
use crate::domain::repository::{WebhookEventRepository, WebhookSignatureVerifier};

/// The gateway callback endpoint's application-layer face (§4.I). Verifies
/// the HMAC signature over the raw body, deduplicates on `event_id`, and
/// hands the durable row to the in-process queue — insert-before-enqueue,
/// so a crash between the two still leaves the row for the background
/// poller to pick up (§9 open question (c)).
#[derive(Clone)]
pub struct IngestWebhookUseCase {
    webhook_repo: Arc<dyn WebhookEventRepository>,
    verifier: Arc<dyn WebhookSignatureVerifier>,
    queue: Sender<common::WebhookEventId>,
}

impl IngestWebhookUseCase {
    pub fn new(
        webhook_repo: Arc<dyn WebhookEventRepository>,
        verifier: Arc<dyn WebhookSignatureVerifier>,
        queue: Sender<common::WebhookEventId>,
    ) -> Self {
        Self {
            webhook_repo,
            verifier,
            queue,
        }
    }

    #[tracing::instrument(name = "IngestWebhookUseCase::execute", skip(self, raw_body))]
    pub async fn execute(
        &self,
        raw_body: &[u8],
        signature_hex: &str,
        event_id: String,
        event_type: String,
        payload: serde_json::Value,
    ) -> Result<WebhookEvent, DomainError> {
        if !self.verifier.verify(raw_body, signature_hex) {
            return Err(DomainError::unauthorized("invalid webhook signature"));
        }

        let event = WebhookEvent::new(event_id, event_type, payload);
        let stored = self.webhook_repo.create_if_absent(&event).await?;

        // A best-effort nudge only: if the channel is full or the worker is
        // briefly down, the background poller in §4.J still finds this row.
        let _ = self.queue.try_send(stored.id);

        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use common::WebhookEventId;
    use mockall::mock;

    use super::*;

    mock! {
        pub WebhookEventRepositoryImpl {}

        #[async_trait]
        impl WebhookEventRepository for WebhookEventRepositoryImpl {
            async fn find_by_event_id(&self, event_id: &str) -> Result<Option<WebhookEvent>, DomainError>;
            async fn create_if_absent(&self, event: &WebhookEvent) -> Result<WebhookEvent, DomainError>;
            async fn update(&self, event: &WebhookEvent) -> Result<(), DomainError>;
            async fn find_retryable(&self, max_retries: i32, retry_base_seconds: i64, limit: i64) -> Result<Vec<WebhookEvent>, DomainError>;
            async fn delete_processed_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, DomainError>;
        }
    }

    struct AlwaysVerifies;
    impl WebhookSignatureVerifier for AlwaysVerifies {
        fn verify(&self, _raw_body: &[u8], _signature_hex: &str) -> bool {
            true
        }
    }

    struct NeverVerifies;
    impl WebhookSignatureVerifier for NeverVerifies {
        fn verify(&self, _raw_body: &[u8], _signature_hex: &str) -> bool {
            false
        }
    }

    #[tokio::test]
    async fn rejects_an_invalid_signature() {
        let repo = MockWebhookEventRepositoryImpl::new();
        let (tx, _rx) = tokio::sync::mpsc::channel::<WebhookEventId>(4);
        let use_case = IngestWebhookUseCase::new(Arc::new(repo), Arc::new(NeverVerifies), tx);

        let result = use_case
            .execute(b"{}", "deadbeef", "evt_1".to_string(), "payment.succeeded".to_string(), serde_json::Value::Null)
            .await;
        assert!(matches!(result, Err(DomainError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn stores_and_enqueues_a_valid_event() {
        let mut repo = MockWebhookEventRepositoryImpl::new();
        repo.expect_create_if_absent()
            .times(1)
            .returning(|event| Ok(event.clone()));

        let (tx, mut rx) = tokio::sync::mpsc::channel::<WebhookEventId>(4);
        let use_case = IngestWebhookUseCase::new(Arc::new(repo), Arc::new(AlwaysVerifies), tx);

        let stored = use_case
            .execute(b"{}", "deadbeef", "evt_1".to_string(), "payment.succeeded".to_string(), serde_json::Value::Null)
            .await
            .unwrap();

        let queued = rx.try_recv().unwrap();
        assert_eq!(queued, stored.id);
    }
}
