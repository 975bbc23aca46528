use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use common::TransactionId;
use tokio::sync::RwLock;

struct CacheEntry {
    transaction_id: TransactionId,
    expires_at: DateTime<Utc>,
}

/// Fast-path lookup from `reference_id` to `transaction_id`, TTL ~24h
/// (§4.E). This is deliberately an optimization, not a source of truth:
/// the `transactions.reference_id` unique index is authoritative, and a
/// cache miss (cold start, eviction, multi-process deployment without a
/// shared cache) never produces an incorrect money move — it only costs
/// an extra index lookup on the Transfer Engine's slow path.
///
/// Grounded on the two-tier idempotency design in
/// `nimeshk03-hpc_pay_settlement_engine`'s `idempotency` module, narrowed
/// to this system's single `reference_id -> transaction_id` mapping and
/// backed by an in-process map instead of Redis, since nothing else in
/// this service needs a shared cache tier.
pub struct IdempotencyCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl IdempotencyCache {
    pub fn new(ttl_seconds: i64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: Duration::seconds(ttl_seconds),
        }
    }

    pub async fn get(&self, reference_id: &str) -> Option<TransactionId> {
        let entries = self.entries.read().await;
        match entries.get(reference_id) {
            Some(entry) if entry.expires_at > Utc::now() => Some(entry.transaction_id),
            _ => None,
        }
    }

    pub async fn put(&self, reference_id: String, transaction_id: TransactionId) {
        let mut entries = self.entries.write().await;
        entries.insert(
            reference_id,
            CacheEntry {
                transaction_id,
                expires_at: Utc::now() + self.ttl,
            },
        );
    }

    /// Evicts expired entries. Called from the maintenance job (§4.K)
    /// alongside the webhook-event purge, since both are pure, harmless
    /// housekeeping over state whose authority lives elsewhere.
    pub async fn sweep_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        let now = Utc::now();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_returns_the_cached_transaction() {
        let cache = IdempotencyCache::new(60);
        let txn_id = TransactionId::new();
        cache.put("TXN-ABC".to_string(), txn_id).await;
        assert_eq!(cache.get("TXN-ABC").await, Some(txn_id));
    }

    #[tokio::test]
    async fn miss_on_unknown_key() {
        let cache = IdempotencyCache::new(60);
        assert_eq!(cache.get("TXN-UNKNOWN").await, None);
    }

    #[tokio::test]
    async fn expired_entries_are_not_returned() {
        let cache = IdempotencyCache::new(-1);
        cache.put("TXN-OLD".to_string(), TransactionId::new()).await;
        assert_eq!(cache.get("TXN-OLD").await, None);
    }

    #[tokio::test]
    async fn sweep_removes_expired_entries_only() {
        let cache = IdempotencyCache::new(60);
        cache.put("fresh".to_string(), TransactionId::new()).await;
        let stale = IdempotencyCache::new(-1);
        stale.put("stale".to_string(), TransactionId::new()).await;
        let removed = stale.sweep_expired().await;
        assert_eq!(removed, 1);
        assert!(cache.get("fresh").await.is_some());
    }
}
