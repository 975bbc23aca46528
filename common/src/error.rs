use thiserror::Error;

/// The error taxonomy surfaced at every service boundary. Each kind maps
/// to exactly one HTTP status class at the adapter; nothing upstream of
/// the adapter should text-match an error message to decide behavior.
///
/// `DuplicateTransaction` is deliberately absent here: an idempotency hit
/// is not a failure, it is a successful return of the pre-existing
/// transaction, so it never travels as an `Err`.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    #[error("insufficient balance")]
    InsufficientBalance,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn invalid_transaction(message: impl Into<String>) -> Self {
        Self::InvalidTransaction(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}
