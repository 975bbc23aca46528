//! Every use case in this crate returns `common::DomainError` directly —
//! there is deliberately only one error taxonomy (§7), unlike the two
//! divergent per-service enums this crate's predecessor carried.

pub use common::DomainError;
