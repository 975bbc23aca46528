//! Shared kernel for the payments core: the `Money` type, stable ID
//! newtypes, and the domain error taxonomy used at every service boundary.

pub mod error;
pub mod ids;
pub mod money;

pub use error::DomainError;
pub use ids::{
    LedgerEntryId, PaymentIntentId, TransactionId, UserId, WalletId, WebhookEventId,
};
pub use money::Money;
