use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use common::{DomainError, Money, TransactionId, UserId};
use mockall::mock;
use tokio::sync::mpsc;

use ledger_service::api::http_routes::{create_transfer, get_wallet_balance, AppState, CreateTransferRequest};
use ledger_service::config::Config;
use ledger_service::domain::entities::{KycStatus, Transaction, TransactionType, User, Wallet};
use ledger_service::domain::idempotency::IdempotencyCache;
use ledger_service::domain::repository::{
    AccountRegistrar, DepositCommand, LedgerEngine, PaymentIntentRepository, TransactionRepository,
    TransferCommand, UserRepository, WalletRepository, WebhookEventRepository,
    WebhookSignatureVerifier,
};
use ledger_service::use_cases::approve_kyc::ApproveKycUseCase;
use ledger_service::use_cases::create_payment_intent::CreatePaymentIntentUseCase;
use ledger_service::use_cases::get_transaction_details::GetTransactionDetailsUseCase;
use ledger_service::use_cases::get_wallet_balance::GetWalletBalanceUseCase;
use ledger_service::use_cases::ingest_webhook::IngestWebhookUseCase;
use ledger_service::use_cases::list_transactions::ListTransactionsUseCase;
use ledger_service::use_cases::register_user::RegisterUserUseCase;
use ledger_service::use_cases::reject_kyc::RejectKycUseCase;
use ledger_service::use_cases::submit_kyc::SubmitKycUseCase;
use ledger_service::use_cases::transfer::TransferUseCase;

mock! {
    pub UserRepositoryImpl {}

    #[async_trait]
    impl UserRepository for UserRepositoryImpl {
        async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DomainError>;
        async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;
        async fn create(&self, user: &User) -> Result<(), DomainError>;
        async fn update(&self, user: &User) -> Result<(), DomainError>;
    }
}

mock! {
    pub WalletRepositoryImpl {}

    #[async_trait]
    impl WalletRepository for WalletRepositoryImpl {
        async fn find_by_user_id(&self, user_id: UserId) -> Result<Option<Wallet>, DomainError>;
        async fn find_by_id(&self, id: common::WalletId) -> Result<Option<Wallet>, DomainError>;
        async fn create(&self, wallet: &Wallet) -> Result<(), DomainError>;
    }
}

mock! {
    pub TransactionRepositoryImpl {}

    #[async_trait]
    impl TransactionRepository for TransactionRepositoryImpl {
        async fn find_by_id(&self, id: TransactionId) -> Result<Option<Transaction>, DomainError>;
        async fn find_by_reference_id(&self, reference_id: &str) -> Result<Option<Transaction>, DomainError>;
        async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<Transaction>, DomainError>;
    }
}

mock! {
    pub LedgerEngineImpl {}

    #[async_trait]
    impl LedgerEngine for LedgerEngineImpl {
        async fn transfer(&self, cmd: TransferCommand) -> Result<Transaction, DomainError>;
        async fn deposit(&self, cmd: DepositCommand) -> Result<Transaction, DomainError>;
    }
}

mock! {
    pub PaymentIntentRepositoryImpl {}

    #[async_trait]
    impl PaymentIntentRepository for PaymentIntentRepositoryImpl {
        async fn find_by_id(&self, id: common::PaymentIntentId) -> Result<Option<ledger_service::domain::entities::PaymentIntent>, DomainError>;
        async fn find_by_gateway_payment_id(&self, gateway_payment_id: &str) -> Result<Option<ledger_service::domain::entities::PaymentIntent>, DomainError>;
        async fn create(&self, intent: &ledger_service::domain::entities::PaymentIntent) -> Result<(), DomainError>;
        async fn update(&self, intent: &ledger_service::domain::entities::PaymentIntent) -> Result<(), DomainError>;
    }
}

mock! {
    pub AccountRegistrarImpl {}

    #[async_trait]
    impl AccountRegistrar for AccountRegistrarImpl {
        async fn register(&self, email: String) -> Result<(User, Wallet), DomainError>;
    }
}

mock! {
    pub WebhookEventRepositoryImpl {}

    #[async_trait]
    impl WebhookEventRepository for WebhookEventRepositoryImpl {
        async fn find_by_event_id(&self, event_id: &str) -> Result<Option<ledger_service::domain::entities::WebhookEvent>, DomainError>;
        async fn create_if_absent(&self, event: &ledger_service::domain::entities::WebhookEvent) -> Result<ledger_service::domain::entities::WebhookEvent, DomainError>;
        async fn update(&self, event: &ledger_service::domain::entities::WebhookEvent) -> Result<(), DomainError>;
        async fn find_retryable(&self, max_retries: i32, retry_base_seconds: i64, limit: i64) -> Result<Vec<ledger_service::domain::entities::WebhookEvent>, DomainError>;
        async fn delete_processed_older_than(&self, cutoff: chrono::DateTime<Utc>) -> Result<u64, DomainError>;
    }
}

struct NeverVerifies;

impl WebhookSignatureVerifier for NeverVerifies {
    fn verify(&self, _raw_body: &[u8], _signature_hex: &str) -> bool {
        false
    }
}

fn test_config() -> Arc<Config> {
    Arc::new(Config {
        database_url: String::new(),
        http_host: "127.0.0.1".to_string(),
        http_port: 3000,
        min_transaction_amount: Money::parse("0.01").unwrap(),
        max_transaction_amount: Money::parse("1000000.00").unwrap(),
        idempotency_timeout_seconds: 86_400,
        webhook_secret: Vec::new(),
        webhook_max_retries: 3,
        webhook_retry_base_seconds: 60,
        webhook_retention_days: 90,
        db_statement_timeout_seconds: 5,
    })
}

fn verified_user() -> User {
    User::reconstitute(
        UserId::new(),
        "verified@example.com".to_string(),
        KycStatus::Verified,
        true,
        false,
        None,
        Some(Utc::now()),
        Utc::now(),
    )
    .unwrap()
}

fn build_state(
    user_repo: MockUserRepositoryImpl,
    transaction_repo: MockTransactionRepositoryImpl,
    ledger_engine: MockLedgerEngineImpl,
    wallet_repo: MockWalletRepositoryImpl,
) -> Arc<AppState> {
    let user_repo = Arc::new(user_repo);
    let transaction_repo = Arc::new(transaction_repo);
    let ledger_engine = Arc::new(ledger_engine);
    let wallet_repo = Arc::new(wallet_repo);
    let payment_intent_repo = Arc::new(MockPaymentIntentRepositoryImpl::new());
    let webhook_repo = Arc::new(MockWebhookEventRepositoryImpl::new());
    let (webhook_tx, _webhook_rx) = mpsc::channel(1);

    Arc::new(AppState {
        register_user: RegisterUserUseCase::new(Arc::new(MockAccountRegistrarImpl::new())),
        submit_kyc: SubmitKycUseCase::new(user_repo.clone()),
        approve_kyc: ApproveKycUseCase::new(user_repo.clone()),
        reject_kyc: RejectKycUseCase::new(user_repo.clone()),
        get_wallet_balance: GetWalletBalanceUseCase::new(wallet_repo),
        transfer: TransferUseCase::new(
            user_repo.clone(),
            transaction_repo.clone(),
            ledger_engine,
            Arc::new(IdempotencyCache::new(60)),
            test_config(),
        ),
        create_payment_intent: CreatePaymentIntentUseCase::new(payment_intent_repo),
        list_transactions: ListTransactionsUseCase::new(transaction_repo.clone()),
        get_transaction_details: GetTransactionDetailsUseCase::new(transaction_repo),
        ingest_webhook: IngestWebhookUseCase::new(webhook_repo, Arc::new(NeverVerifies), webhook_tx),
    })
}

#[tokio::test]
async fn http_transfer_endpoint_returns_the_completed_transaction() {
    let from = verified_user();
    let to = verified_user();
    let from_id = from.id();
    let to_id = to.id();

    let mut user_repo = MockUserRepositoryImpl::new();
    user_repo
        .expect_find_by_id()
        .withf(move |id| *id == from_id)
        .returning(move |_| Ok(Some(from.clone())));
    user_repo
        .expect_find_by_id()
        .withf(move |id| *id == to_id)
        .returning(move |_| Ok(Some(to.clone())));

    let mut transaction_repo = MockTransactionRepositoryImpl::new();
    transaction_repo.expect_find_by_reference_id().returning(|_| Ok(None));

    let mut ledger_engine = MockLedgerEngineImpl::new();
    ledger_engine.expect_transfer().times(1).returning(move |cmd| {
        let mut txn = Transaction::new_transfer(cmd.reference_id, cmd.from_user, cmd.to_user, cmd.amount, cmd.description)
            .unwrap();
        txn.mark_completed();
        Ok(txn)
    });

    let state = build_state(
        user_repo,
        transaction_repo,
        ledger_engine,
        MockWalletRepositoryImpl::new(),
    );

    let payload = CreateTransferRequest {
        reference_id: Some("TXN-HTTP-1".to_string()),
        from_user: from_id,
        to_user: to_id,
        amount: Money::parse("25.00").unwrap(),
        description: None,
    };

    let response = create_transfer(State(state), Json(payload)).await.expect("transfer should succeed");

    assert_eq!(response.0.status, "success");
    assert_eq!(response.0.data.reference_id, "TXN-HTTP-1");
    assert_eq!(response.0.data.transaction_type, format!("{:?}", TransactionType::Transfer));
}

#[tokio::test]
async fn http_wallet_balance_endpoint_surfaces_not_found_as_404() {
    let user_id = UserId::new();

    let mut wallet_repo = MockWalletRepositoryImpl::new();
    wallet_repo.expect_find_by_user_id().returning(|_| Ok(None));

    let state = build_state(
        MockUserRepositoryImpl::new(),
        MockTransactionRepositoryImpl::new(),
        MockLedgerEngineImpl::new(),
        wallet_repo,
    );

    let result = get_wallet_balance(State(state), Path(user_id)).await;

    assert!(matches!(result, Err(ledger_service::api::error::ApiError(DomainError::NotFound(_)))));
}
