pub mod approve_kyc;
pub mod create_payment_intent;
pub mod get_transaction_details;
pub mod get_wallet_balance;
pub mod ingest_webhook;
pub mod list_transactions;
pub mod process_webhook_event;
pub mod register_user;
pub mod reject_kyc;
pub mod submit_kyc;
pub mod transfer;
