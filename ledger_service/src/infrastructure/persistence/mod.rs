pub mod ledger_repository;
pub mod models;
pub mod payment_intent_repository;
pub mod transaction_repository;
pub mod user_repository;
pub mod wallet_repository;
pub mod webhook_event_repository;

use common::DomainError;

/// Maps a raw `sqlx::Error` into the crate's single error taxonomy. Unique
/// and foreign-key violations never surface here as `Internal` — callers
/// that expect a constraint to be meaningful (e.g. the KYC unique email
/// index, the webhook `event_id` dedup insert) check for them explicitly
/// before falling back to this.
pub fn map_db_err(err: sqlx::Error) -> DomainError {
    DomainError::internal(err.to_string())
}
