use async_trait::async_trait;
use common::{DomainError, Money, PaymentIntentId, TransactionId, UserId, WalletId, WebhookEventId};

use crate::domain::entities::{
    LedgerEntry, PaymentIntent, Transaction, User, Wallet, WebhookEvent,
};

/// Port for user persistence and the KYC gate's state (§4.G).
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DomainError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;
    async fn create(&self, user: &User) -> Result<(), DomainError>;
    /// Persists the full row back — used after any KYC transition.
    async fn update(&self, user: &User) -> Result<(), DomainError>;
}

/// Read-side port for wallets. Balance mutation never goes through this
/// trait — only the Transfer Engine (`LedgerEngine`) may change a
/// balance, and it does so inside one DB transaction alongside the ledger
/// and transaction-header writes (§4.B, §9).
#[async_trait]
pub trait WalletRepository: Send + Sync {
    async fn find_by_user_id(&self, user_id: UserId) -> Result<Option<Wallet>, DomainError>;
    async fn find_by_id(&self, id: WalletId) -> Result<Option<Wallet>, DomainError>;
    async fn create(&self, wallet: &Wallet) -> Result<(), DomainError>;
}

/// Read-side port for transaction headers, plus the idempotency lookup
/// the Transfer Engine consults as its authoritative fallback (§4.E).
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn find_by_id(&self, id: TransactionId) -> Result<Option<Transaction>, DomainError>;
    async fn find_by_reference_id(&self, reference_id: &str) -> Result<Option<Transaction>, DomainError>;
    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<Transaction>, DomainError>;
}

/// Append-only ledger queries (§4.C). Insertion happens only inside
/// `LedgerEngine`'s transactional body, never through this trait.
#[async_trait]
pub trait LedgerRepository: Send + Sync {
    async fn find_by_transaction_id(&self, transaction_id: TransactionId) -> Result<Vec<LedgerEntry>, DomainError>;
    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<LedgerEntry>, DomainError>;
    /// Sum of `CREDIT - DEBIT` for a user, used by the wallet-ledger
    /// agreement property test (§8 invariant 2).
    async fn balance_of(&self, user_id: UserId) -> Result<Money, DomainError>;
}

#[async_trait]
pub trait PaymentIntentRepository: Send + Sync {
    async fn find_by_id(&self, id: PaymentIntentId) -> Result<Option<PaymentIntent>, DomainError>;
    async fn find_by_gateway_payment_id(&self, gateway_payment_id: &str) -> Result<Option<PaymentIntent>, DomainError>;
    async fn create(&self, intent: &PaymentIntent) -> Result<(), DomainError>;
    async fn update(&self, intent: &PaymentIntent) -> Result<(), DomainError>;
}

#[async_trait]
pub trait WebhookEventRepository: Send + Sync {
    async fn find_by_event_id(&self, event_id: &str) -> Result<Option<WebhookEvent>, DomainError>;
    /// Inserts the row if `event_id` is new; returns the pre-existing row
    /// unchanged if it already exists (§4.I step 3's dedup-on-insert).
    async fn create_if_absent(&self, event: &WebhookEvent) -> Result<WebhookEvent, DomainError>;
    async fn update(&self, event: &WebhookEvent) -> Result<(), DomainError>;
    /// Rows in `PENDING`, or `FAILED` with `retry_count < max_retries` whose
    /// exponential-backoff window (`retry_base_seconds * 2^retry_count`,
    /// measured from `last_attempt_at`) has elapsed, ordered oldest first —
    /// the durable backlog the background worker polls (§4.J step 5).
    async fn find_retryable(
        &self,
        max_retries: i32,
        retry_base_seconds: i64,
        limit: i64,
    ) -> Result<Vec<WebhookEvent>, DomainError>;
    /// §4.K: processed rows older than the retention window.
    async fn delete_processed_older_than(&self, cutoff: chrono::DateTime<chrono::Utc>) -> Result<u64, DomainError>;
}

/// The command issued to `LedgerEngine::transfer`. `reference_id` is
/// already resolved (caller-supplied idempotency key, or a generated
/// `TXN-...`) by the time it reaches this port.
#[derive(Debug, Clone)]
pub struct TransferCommand {
    pub reference_id: String,
    pub from_user: UserId,
    pub to_user: UserId,
    pub amount: Money,
    pub description: Option<String>,
}

/// The command issued to `LedgerEngine::deposit`, called only by the
/// webhook processor (§4.F).
#[derive(Debug, Clone)]
pub struct DepositCommand {
    pub reference_id: String,
    pub to_user: UserId,
    pub amount: Money,
    pub description: Option<String>,
}

/// The Transfer Engine (§4.F, THE CORE). A single method call here is one
/// database transaction: deterministic wallet lock ordering, balance
/// reads, the insufficient-funds check, both wallet updates, the two (or
/// one, for deposits) ledger inserts, and the transaction-header
/// transition to `COMPLETED`/`FAILED`, all committed atomically.
///
/// This is a separate port from the fine-grained repositories above
/// because it is the only operation in this system that must hold more
/// than one table's write lock inside a single transaction — folding it
/// into a generic repository trait would force every other repository
/// method to thread a transaction handle it does not need.
#[async_trait]
pub trait LedgerEngine: Send + Sync {
    async fn transfer(&self, cmd: TransferCommand) -> Result<Transaction, DomainError>;
    async fn deposit(&self, cmd: DepositCommand) -> Result<Transaction, DomainError>;
}

/// Replaces the original system's "wallet-on-user-creation signal" (§9):
/// user row and wallet row are inserted together as one committed
/// transaction, not as two independently-failing repository calls.
#[async_trait]
pub trait AccountRegistrar: Send + Sync {
    async fn register(&self, email: String) -> Result<(User, Wallet), DomainError>;
}

/// Verifies the webhook ingestor's HMAC-SHA256 signature over the exact
/// bytes of the received request body (§4.I, §9 open question (a)). A
/// trait rather than a bare function so the ingestor use case can be
/// tested with a fake verifier instead of a real secret.
pub trait WebhookSignatureVerifier: Send + Sync {
    fn verify(&self, raw_body: &[u8], signature_hex: &str) -> bool;
}
