use chrono::{DateTime, Utc};
use common::DomainError;
use common::Money;
use common::{LedgerEntryId, PaymentIntentId, TransactionId, UserId, WalletId, WebhookEventId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// KYC review state. Only `Verified` combined with `User::active` satisfies
/// `can_transact`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "kyc_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KycStatus {
    Pending,
    InReview,
    Verified,
    Rejected,
    Expired,
}

/// Opaque user identity and the KYC gate state machine (§4.G).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    email: String,
    kyc_status: KycStatus,
    active: bool,
    is_staff: bool,
    kyc_submitted_at: Option<DateTime<Utc>>,
    kyc_verified_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: String) -> Result<Self, DomainError> {
        validate_email(&email)?;
        Ok(Self {
            id: UserId::new(),
            email,
            kyc_status: KycStatus::Pending,
            active: true,
            is_staff: false,
            kyc_submitted_at: None,
            kyc_verified_at: None,
            created_at: Utc::now(),
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: UserId,
        email: String,
        kyc_status: KycStatus,
        active: bool,
        is_staff: bool,
        kyc_submitted_at: Option<DateTime<Utc>>,
        kyc_verified_at: Option<DateTime<Utc>>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        validate_email(&email)?;
        Ok(Self {
            id,
            email,
            kyc_status,
            active,
            is_staff,
            kyc_submitted_at,
            kyc_verified_at,
            created_at,
        })
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn kyc_status(&self) -> KycStatus {
        self.kyc_status
    }

    pub fn active(&self) -> bool {
        self.active
    }

    pub fn is_staff(&self) -> bool {
        self.is_staff
    }

    pub fn kyc_submitted_at(&self) -> Option<DateTime<Utc>> {
        self.kyc_submitted_at
    }

    pub fn kyc_verified_at(&self) -> Option<DateTime<Utc>> {
        self.kyc_verified_at
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The authorization predicate the Transfer Engine checks before, and
    /// again inside, every money movement (§9 open question (b)).
    pub fn can_transact(&self) -> bool {
        self.active && self.kyc_status == KycStatus::Verified
    }

    /// `PENDING|IN_REVIEW|REJECTED|EXPIRED --submit--> IN_REVIEW`. Mirrors
    /// the original system's `submit_kyc`: only an already-`VERIFIED`
    /// account rejects a resubmission.
    pub fn submit_kyc(&mut self) -> Result<(), DomainError> {
        if self.kyc_status == KycStatus::Verified {
            return Err(DomainError::invalid_transaction(
                "account is already KYC verified",
            ));
        }
        self.kyc_status = KycStatus::InReview;
        self.kyc_submitted_at = Some(Utc::now());
        Ok(())
    }

    /// `IN_REVIEW --approve--> VERIFIED`. Caller must have already checked
    /// the admin privilege flag; this method only enforces the state
    /// machine shape.
    pub fn approve_kyc(&mut self) -> Result<(), DomainError> {
        if self.kyc_status != KycStatus::InReview {
            return Err(DomainError::invalid_transaction(format!(
                "cannot approve KYC from state {:?}",
                self.kyc_status
            )));
        }
        self.kyc_status = KycStatus::Verified;
        self.kyc_verified_at = Some(Utc::now());
        Ok(())
    }

    /// `IN_REVIEW --reject--> REJECTED`.
    pub fn reject_kyc(&mut self) -> Result<(), DomainError> {
        if self.kyc_status != KycStatus::InReview {
            return Err(DomainError::invalid_transaction(format!(
                "cannot reject KYC from state {:?}",
                self.kyc_status
            )));
        }
        self.kyc_status = KycStatus::Rejected;
        Ok(())
    }

    /// `VERIFIED --expire--> EXPIRED`.
    pub fn expire_kyc(&mut self) -> Result<(), DomainError> {
        if self.kyc_status != KycStatus::Verified {
            return Err(DomainError::invalid_transaction(format!(
                "cannot expire KYC from state {:?}",
                self.kyc_status
            )));
        }
        self.kyc_status = KycStatus::Expired;
        Ok(())
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }
}

fn validate_email(email: &str) -> Result<(), DomainError> {
    if email.trim().is_empty() || !email.contains('@') {
        return Err(DomainError::invalid_transaction("invalid email address"));
    }
    Ok(())
}

/// Exactly one wallet per user. Balance is only ever mutated through the
/// Transfer Engine's locked, atomic `UPDATE` statements (§4.B) — the
/// `credit`/`debit` methods here exist for the engine's in-memory
/// before/after bookkeeping, not as a general-purpose mutation API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    id: WalletId,
    user_id: UserId,
    balance: Money,
    updated_at: DateTime<Utc>,
}

impl Wallet {
    pub fn open(user_id: UserId) -> Self {
        Self {
            id: WalletId::new(),
            user_id,
            balance: Money::ZERO,
            updated_at: Utc::now(),
        }
    }

    pub fn reconstitute(
        id: WalletId,
        user_id: UserId,
        balance: Money,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            balance,
            updated_at,
        }
    }

    pub fn id(&self) -> WalletId {
        self.id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn balance(&self) -> Money {
        self.balance
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn credit(&mut self, amount: Money) -> Result<(), DomainError> {
        if !amount.is_positive() {
            return Err(DomainError::invalid_transaction("credit amount must be positive"));
        }
        self.balance = self.balance.checked_add(amount)?;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn debit(&mut self, amount: Money) -> Result<(), DomainError> {
        if !amount.is_positive() {
            return Err(DomainError::invalid_transaction("debit amount must be positive"));
        }
        if self.balance < amount {
            return Err(DomainError::InsufficientBalance);
        }
        self.balance = self.balance.checked_sub(amount)?;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Transfer,
    Deposit,
    Withdrawal,
    Refund,
    Fee,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

/// Immutable header for one logical money movement (§3). Public fields:
/// once `status` reaches `Completed` every field but the housekeeping ones
/// is frozen by convention, not by the type system — the repository layer
/// is the only writer and it only ever issues the transitions §4.D allows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub reference_id: String,
    pub from_user_id: Option<UserId>,
    pub to_user_id: Option<UserId>,
    pub amount: Money,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub from_balance_before: Option<Money>,
    pub from_balance_after: Option<Money>,
    pub to_balance_before: Option<Money>,
    pub to_balance_after: Option<Money>,
    pub description: Option<String>,
    pub metadata: serde_json::Value,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Builds the `PENDING`-phase header for a transfer between two users.
    /// Validates the structural invariants from §3 that do not depend on
    /// runtime configuration (amount range is a Transfer Engine concern,
    /// since `MIN`/`MAX` come from config).
    pub fn new_transfer(
        reference_id: String,
        from_user_id: UserId,
        to_user_id: UserId,
        amount: Money,
        description: Option<String>,
    ) -> Result<Self, DomainError> {
        if from_user_id == to_user_id {
            return Err(DomainError::invalid_transaction("self-transfer"));
        }
        if !amount.is_positive() {
            return Err(DomainError::invalid_transaction("amount must be positive"));
        }
        Ok(Self::new(
            reference_id,
            Some(from_user_id),
            Some(to_user_id),
            amount,
            TransactionType::Transfer,
            description,
        ))
    }

    /// Builds the `PENDING`-phase header for a deposit into one user's
    /// wallet (only `to_user_id` is set).
    pub fn new_deposit(
        reference_id: String,
        to_user_id: UserId,
        amount: Money,
        description: Option<String>,
    ) -> Result<Self, DomainError> {
        if !amount.is_positive() {
            return Err(DomainError::invalid_transaction("amount must be positive"));
        }
        Ok(Self::new(
            reference_id,
            None,
            Some(to_user_id),
            amount,
            TransactionType::Deposit,
            description,
        ))
    }

    fn new(
        reference_id: String,
        from_user_id: Option<UserId>,
        to_user_id: Option<UserId>,
        amount: Money,
        transaction_type: TransactionType,
        description: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::new(),
            reference_id,
            from_user_id,
            to_user_id,
            amount,
            transaction_type,
            status: TransactionStatus::Processing,
            from_balance_before: None,
            from_balance_after: None,
            to_balance_before: None,
            to_balance_after: None,
            description,
            metadata: serde_json::Value::Null,
            error_message: None,
            retry_count: 0,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn mark_completed(&mut self) {
        self.status = TransactionStatus::Completed;
        let now = Utc::now();
        self.updated_at = now;
        self.completed_at = Some(now);
    }

    pub fn mark_failed(&mut self, error_message: impl Into<String>) {
        self.status = TransactionStatus::Failed;
        self.error_message = Some(error_message.into());
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "ledger_entry_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerEntryType {
    Debit,
    Credit,
}

/// Append-only signed movement on one user's account, paired to a
/// transaction (§3). Never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: LedgerEntryId,
    pub transaction_id: TransactionId,
    pub user_id: UserId,
    pub entry_type: LedgerEntryType,
    pub amount: Money,
    pub balance_after: Money,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(
        transaction_id: TransactionId,
        user_id: UserId,
        entry_type: LedgerEntryType,
        amount: Money,
        balance_after: Money,
    ) -> Self {
        Self {
            id: LedgerEntryId::new(),
            transaction_id,
            user_id,
            entry_type,
            amount,
            balance_after,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Card,
    Upi,
    NetBanking,
    Wallet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_intent_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentIntentStatus {
    Pending,
    Processing,
    Succeeded,
    Failed,
    Cancelled,
}

/// Gateway-side intent lifecycle (§3/§4.H). Transitions are driven
/// exclusively by the webhook processor, never by the HTTP adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentIntent {
    id: PaymentIntentId,
    gateway_payment_id: String,
    user_id: UserId,
    amount: Money,
    currency: String,
    payment_method: Option<PaymentMethod>,
    status: PaymentIntentStatus,
    description: Option<String>,
    metadata: serde_json::Value,
    gateway_response: Option<serde_json::Value>,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    succeeded_at: Option<DateTime<Utc>>,
}

impl PaymentIntent {
    pub fn new(
        user_id: UserId,
        amount: Money,
        currency: String,
        description: Option<String>,
    ) -> Self {
        Self {
            id: PaymentIntentId::new(),
            gateway_payment_id: generate_gateway_payment_id(),
            user_id,
            amount,
            currency,
            payment_method: None,
            status: PaymentIntentStatus::Pending,
            description,
            metadata: serde_json::Value::Null,
            gateway_response: None,
            error_message: None,
            created_at: Utc::now(),
            succeeded_at: None,
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub fn reconstitute(
        id: PaymentIntentId,
        gateway_payment_id: String,
        user_id: UserId,
        amount: Money,
        currency: String,
        payment_method: Option<PaymentMethod>,
        status: PaymentIntentStatus,
        description: Option<String>,
        metadata: serde_json::Value,
        gateway_response: Option<serde_json::Value>,
        error_message: Option<String>,
        created_at: DateTime<Utc>,
        succeeded_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            gateway_payment_id,
            user_id,
            amount,
            currency,
            payment_method,
            status,
            description,
            metadata,
            gateway_response,
            error_message,
            created_at,
            succeeded_at,
        }
    }

    pub fn id(&self) -> PaymentIntentId {
        self.id
    }

    pub fn gateway_payment_id(&self) -> &str {
        &self.gateway_payment_id
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn amount(&self) -> Money {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn status(&self) -> PaymentIntentStatus {
        self.status
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn payment_method(&self) -> Option<PaymentMethod> {
        self.payment_method
    }

    pub fn metadata(&self) -> &serde_json::Value {
        &self.metadata
    }

    pub fn gateway_response(&self) -> Option<&serde_json::Value> {
        self.gateway_response.as_ref()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn succeeded_at(&self) -> Option<DateTime<Utc>> {
        self.succeeded_at
    }

    /// Deposit `reference_id` per §4.J: derived from the gateway payment so
    /// repeated webhook delivery is at-most-once by construction.
    pub fn deposit_reference_id(&self) -> String {
        format!("DEPOSIT-{}", self.gateway_payment_id)
    }

    pub fn mark_succeeded(&mut self, gateway_response: serde_json::Value) {
        self.status = PaymentIntentStatus::Succeeded;
        self.gateway_response = Some(gateway_response);
        self.succeeded_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error_message: impl Into<String>) {
        self.status = PaymentIntentStatus::Failed;
        self.error_message = Some(error_message.into());
    }
}

pub fn generate_gateway_payment_id() -> String {
    format!("PAY-{}", &Uuid::new_v4().simple().to_string().to_uppercase()[..16])
}

pub fn generate_transaction_reference_id() -> String {
    format!("TXN-{}", &Uuid::new_v4().simple().to_string().to_uppercase()[..16])
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "webhook_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WebhookStatus {
    Pending,
    Processing,
    Processed,
    Failed,
}

/// Durable record of one gateway callback delivery, deduplicated on
/// `event_id` (§3/§4.I/§4.J).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEvent {
    pub id: WebhookEventId,
    pub event_id: String,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub status: WebhookStatus,
    pub error_message: Option<String>,
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub last_attempt_at: Option<DateTime<Utc>>,
}

impl WebhookEvent {
    pub fn new(event_id: String, event_type: String, payload: serde_json::Value) -> Self {
        Self {
            id: WebhookEventId::new(),
            event_id,
            event_type,
            payload,
            status: WebhookStatus::Pending,
            error_message: None,
            retry_count: 0,
            created_at: Utc::now(),
            processed_at: None,
            last_attempt_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, WebhookStatus::Processed)
    }

    pub fn mark_processing(&mut self) {
        self.status = WebhookStatus::Processing;
        self.last_attempt_at = Some(Utc::now());
    }

    pub fn mark_processed(&mut self) {
        self.status = WebhookStatus::Processed;
        self.processed_at = Some(Utc::now());
    }

    /// Per §4.J step 5: increments `retry_count` so the caller can compute
    /// the next exponential-backoff delay.
    pub fn mark_failed(&mut self, error_message: impl Into<String>) {
        self.status = WebhookStatus::Failed;
        self.error_message = Some(error_message.into());
        self.retry_count += 1;
    }

    /// `delay = base_seconds * 2^retry_count`, matching the original
    /// system's Celery retry formula.
    pub fn next_retry_delay_seconds(&self, base_seconds: i64) -> i64 {
        base_seconds * 2i64.pow(self.retry_count.max(0) as u32)
    }

    /// §4.J step 5: a `PENDING` row has never been attempted and is always
    /// ready; a `FAILED` row is only ready once its backoff window (keyed
    /// off the last attempt, not the original failure) has elapsed.
    pub fn is_ready_to_retry(&self, base_seconds: i64) -> bool {
        match self.status {
            WebhookStatus::Pending => true,
            WebhookStatus::Failed => match self.last_attempt_at {
                None => true,
                Some(last) => Utc::now() >= last + chrono::Duration::seconds(self.next_retry_delay_seconds(base_seconds)),
            },
            WebhookStatus::Processing | WebhookStatus::Processed => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_can_transact_requires_active_and_verified() {
        let mut user = User::new("a@example.com".to_string()).unwrap();
        assert!(!user.can_transact());
        user.submit_kyc().unwrap();
        assert!(!user.can_transact());
        user.approve_kyc().unwrap();
        assert!(user.can_transact());
        user.deactivate();
        assert!(!user.can_transact());
    }

    #[test]
    fn kyc_rejects_invalid_transitions() {
        let mut user = User::new("a@example.com".to_string()).unwrap();
        assert!(user.approve_kyc().is_err());
        user.submit_kyc().unwrap();
        user.approve_kyc().unwrap();
        assert!(user.submit_kyc().is_err());
    }

    #[test]
    fn kyc_resubmit_after_rejection() {
        let mut user = User::new("a@example.com".to_string()).unwrap();
        user.submit_kyc().unwrap();
        user.reject_kyc().unwrap();
        assert_eq!(user.kyc_status(), KycStatus::Rejected);
        user.submit_kyc().unwrap();
        assert_eq!(user.kyc_status(), KycStatus::InReview);
    }

    #[test]
    fn kyc_expire_then_resubmit() {
        let mut user = User::new("a@example.com".to_string()).unwrap();
        user.submit_kyc().unwrap();
        user.approve_kyc().unwrap();
        user.expire_kyc().unwrap();
        assert_eq!(user.kyc_status(), KycStatus::Expired);
        user.submit_kyc().unwrap();
        assert_eq!(user.kyc_status(), KycStatus::InReview);
    }

    #[test]
    fn wallet_debit_rejects_insufficient_balance() {
        let mut wallet = Wallet::open(UserId::new());
        wallet.credit(Money::parse("10.00").unwrap()).unwrap();
        assert!(wallet.debit(Money::parse("20.00").unwrap()).is_err());
    }

    #[test]
    fn transfer_rejects_self_transfer() {
        let user = UserId::new();
        let result = Transaction::new_transfer(
            "TXN-TEST".to_string(),
            user,
            user,
            Money::parse("5.00").unwrap(),
            None,
        );
        assert!(result.is_err());
    }

    #[test]
    fn webhook_retry_delay_doubles_each_attempt() {
        let mut event = WebhookEvent::new(
            "evt_1".to_string(),
            "payment.succeeded".to_string(),
            serde_json::Value::Null,
        );
        assert_eq!(event.next_retry_delay_seconds(60), 60);
        event.mark_failed("boom");
        assert_eq!(event.next_retry_delay_seconds(60), 120);
        event.retry_count = 2;
        assert_eq!(event.next_retry_delay_seconds(60), 240);
    }

    #[test]
    fn failed_event_is_not_retryable_until_its_backoff_window_elapses() {
        let mut event = WebhookEvent::new(
            "evt_2".to_string(),
            "payment.succeeded".to_string(),
            serde_json::Value::Null,
        );
        event.mark_processing();
        event.mark_failed("boom");
        assert!(!event.is_ready_to_retry(3600));

        event.last_attempt_at = Some(Utc::now() - chrono::Duration::hours(3));
        assert!(event.is_ready_to_retry(3600));
    }

    #[test]
    fn pending_event_is_always_retryable() {
        let event = WebhookEvent::new(
            "evt_3".to_string(),
            "payment.succeeded".to_string(),
            serde_json::Value::Null,
        );
        assert!(event.is_ready_to_retry(3600));
    }
}
