//! Ledger Service Library
//!
//! This library is the core of the payments platform: account lifecycle and
//! KYC, the double-entry ledger and Transfer Engine, and the payment
//! intent / webhook ingestion pipeline. It exports the modules shared by
//! the application binary and the integration tests.
//!
//! # Modules
//!
//! * `api` - HTTP interface (Axum).
//! * `config` - Environment-sourced runtime configuration.
//! * `domain` - Entities, repository ports, and business rules.
//! * `infrastructure` - Concrete Postgres repositories and adapters.
//! * `jobs` - Background workers (webhook processing, maintenance).
//! * `use_cases` - Application-layer orchestration.

pub mod api;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod jobs;
pub mod use_cases;
