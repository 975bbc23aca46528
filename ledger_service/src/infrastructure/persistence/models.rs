use chrono::{DateTime, Utc};
use common::{LedgerEntryId, Money, PaymentIntentId, TransactionId, UserId, WalletId, WebhookEventId};
use sqlx::FromRow;

use crate::domain::entities::{
    KycStatus, LedgerEntry, LedgerEntryType, PaymentIntent, PaymentIntentStatus, PaymentMethod,
    Transaction, TransactionStatus, TransactionType, User, Wallet, WebhookEvent, WebhookStatus,
};

#[derive(Debug, FromRow)]
pub struct UserModel {
    pub id: UserId,
    pub email: String,
    pub kyc_status: KycStatus,
    pub active: bool,
    pub is_staff: bool,
    pub kyc_submitted_at: Option<DateTime<Utc>>,
    pub kyc_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl UserModel {
    pub fn into_entity(self) -> Result<User, common::DomainError> {
        User::reconstitute(
            self.id,
            self.email,
            self.kyc_status,
            self.active,
            self.is_staff,
            self.kyc_submitted_at,
            self.kyc_verified_at,
            self.created_at,
        )
    }
}

#[derive(Debug, FromRow)]
pub struct WalletModel {
    pub id: WalletId,
    pub user_id: UserId,
    pub balance: Money,
    pub updated_at: DateTime<Utc>,
}

impl From<WalletModel> for Wallet {
    fn from(m: WalletModel) -> Self {
        Wallet::reconstitute(m.id, m.user_id, m.balance, m.updated_at)
    }
}

#[derive(Debug, FromRow)]
pub struct TransactionModel {
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

impl From<TransactionModel> for Transaction {
    fn from(m: TransactionModel) -> Self {
        Transaction {
            id: m.id,
            reference_id: m.reference_id,
            from_user_id: m.from_user_id,
            to_user_id: m.to_user_id,
            amount: m.amount,
            transaction_type: m.transaction_type,
            status: m.status,
            from_balance_before: m.from_balance_before,
            from_balance_after: m.from_balance_after,
            to_balance_before: m.to_balance_before,
            to_balance_after: m.to_balance_after,
            description: m.description,
            metadata: m.metadata,
            error_message: m.error_message,
            retry_count: m.retry_count,
            created_at: m.created_at,
            updated_at: m.updated_at,
            completed_at: m.completed_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct LedgerEntryModel {
    pub id: LedgerEntryId,
    pub transaction_id: TransactionId,
    pub user_id: UserId,
    pub entry_type: LedgerEntryType,
    pub amount: Money,
    pub balance_after: Money,
    pub created_at: DateTime<Utc>,
}

impl From<LedgerEntryModel> for LedgerEntry {
    fn from(m: LedgerEntryModel) -> Self {
        LedgerEntry {
            id: m.id,
            transaction_id: m.transaction_id,
            user_id: m.user_id,
            entry_type: m.entry_type,
            amount: m.amount,
            balance_after: m.balance_after,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub struct PaymentIntentModel {
    pub id: PaymentIntentId,
    pub gateway_payment_id: String,
    pub user_id: UserId,
    pub amount: Money,
    pub currency: String,
    pub payment_method: Option<PaymentMethod>,
    pub status: PaymentIntentStatus,
    pub description: Option<String>,
    pub metadata: serde_json::Value,
    pub gateway_response: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub succeeded_at: Option<DateTime<Utc>>,
}

impl From<PaymentIntentModel> for PaymentIntent {
    fn from(m: PaymentIntentModel) -> Self {
        PaymentIntent::reconstitute(
            m.id,
            m.gateway_payment_id,
            m.user_id,
            m.amount,
            m.currency,
            m.payment_method,
            m.status,
            m.description,
            m.metadata,
            m.gateway_response,
            m.error_message,
            m.created_at,
            m.succeeded_at,
        )
    }
}

#[derive(Debug, FromRow)]
pub struct WebhookEventModel {
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

impl From<WebhookEventModel> for WebhookEvent {
    fn from(m: WebhookEventModel) -> Self {
        WebhookEvent {
            id: m.id,
            event_id: m.event_id,
            event_type: m.event_type,
            payload: m.payload,
            status: m.status,
            error_message: m.error_message,
            retry_count: m.retry_count,
            created_at: m.created_at,
            processed_at: m.processed_at,
            last_attempt_at: m.last_attempt_at,
        }
    }
}
