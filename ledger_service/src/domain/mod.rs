pub mod entities;
pub mod error;
pub mod idempotency;
pub mod repository;
