pub mod account_registrar;
pub mod ledger_engine;
pub mod persistence;
pub mod webhook_signature;
