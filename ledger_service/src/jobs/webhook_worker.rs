use std::sync::Arc;
use std::time::Duration;

use common::WebhookEventId;
use tokio::sync::mpsc::Receiver;
use tracing::{error, info, warn};

use crate::domain::repository::WebhookEventRepository;
use crate::use_cases::process_webhook_event::ProcessWebhookEventUseCase;

/// Background consumer for the webhook pipeline (§4.J). Two sources feed
/// it: the in-process `mpsc` channel the ingestor nudges on every
/// delivery, and a periodic poll of the durable `PENDING`/`FAILED`
/// backlog so a delivery that never made it onto the channel (process
/// restart, full channel) is never stuck forever.
///
/// Grounded on `jobs/retry.rs`'s shape (a struct wrapping the
/// collaborators it retries with, a `run` method the scheduler loop
/// calls on an interval) plus a channel-consuming loop for the fast path.
pub struct WebhookWorker {
    webhook_repo: Arc<dyn WebhookEventRepository>,
    process_event: ProcessWebhookEventUseCase,
    max_retries: i32,
    retry_base_seconds: i64,
}

impl WebhookWorker {
    pub fn new(
        webhook_repo: Arc<dyn WebhookEventRepository>,
        process_event: ProcessWebhookEventUseCase,
        max_retries: i32,
        retry_base_seconds: i64,
    ) -> Self {
        Self {
            webhook_repo,
            process_event,
            max_retries,
            retry_base_seconds,
        }
    }

    /// Drains the channel until the sender side is dropped. Each nudge is
    /// an event id to process immediately; the poll loop is the backstop.
    pub async fn run_channel_consumer(&self, mut queue: Receiver<WebhookEventId>) {
        info!("webhook channel consumer started");
        while let Some(event_id) = queue.recv().await {
            self.process_one(event_id).await;
        }
        warn!("webhook channel consumer stopped: sender dropped");
    }

    /// Polls the durable backlog on a fixed interval. Catches anything the
    /// channel missed and re-drives `FAILED` rows whose backoff window has
    /// elapsed.
    pub async fn run_poll_loop(&self, interval: Duration) {
        info!("webhook poll loop started");
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            self.poll_once().await;
        }
    }

    async fn poll_once(&self) {
        match self
            .webhook_repo
            .find_retryable(self.max_retries, self.retry_base_seconds, 100)
            .await
        {
            Ok(events) => {
                for event in events {
                    self.process_one(event.id).await;
                }
            }
            Err(e) => error!("failed to fetch retryable webhook events: {:?}", e),
        }
    }

    async fn process_one(&self, event_id: WebhookEventId) {
        if let Err(e) = self.process_event.execute(event_id).await {
            warn!("webhook event {} failed: {:?}", event_id, e);
        }
    }
}
