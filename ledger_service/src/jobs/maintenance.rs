use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{error, info};

use crate::domain::idempotency::IdempotencyCache;
use crate::domain::repository::WebhookEventRepository;

/// Periodic housekeeping (§4.K): purges processed webhook events past the
/// retention window and sweeps expired idempotency cache entries. Neither
/// operation ever touches wallet or ledger state, so a failed run simply
/// tries again next tick.
pub struct MaintenanceJob {
    webhook_repo: Arc<dyn WebhookEventRepository>,
    idempotency_cache: Arc<IdempotencyCache>,
    retention_days: i64,
}

impl MaintenanceJob {
    pub fn new(
        webhook_repo: Arc<dyn WebhookEventRepository>,
        idempotency_cache: Arc<IdempotencyCache>,
        retention_days: i64,
    ) -> Self {
        Self {
            webhook_repo,
            idempotency_cache,
            retention_days,
        }
    }

    pub async fn run_loop(&self, interval: Duration) {
        info!("maintenance job started");
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            self.run_once().await;
        }
    }

    pub async fn run_once(&self) {
        let cutoff = Utc::now() - chrono::Duration::days(self.retention_days);
        match self.webhook_repo.delete_processed_older_than(cutoff).await {
            Ok(deleted) if deleted > 0 => info!("purged {} processed webhook events", deleted),
            Ok(_) => {}
            Err(e) => error!("failed to purge old webhook events: {:?}", e),
        }

        let evicted = self.idempotency_cache.sweep_expired().await;
        if evicted > 0 {
            info!("evicted {} expired idempotency cache entries", evicted);
        }
    }
}
