use std::sync::Arc;

use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::FmtSubscriber;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use ledger_service::api::http_routes::{
    routes, AppState, CreatePaymentIntentRequest, CreateTransferRequest, KycReviewRequest,
    PaymentIntentResponse, RegisterUserRequest, TransactionResponse, UserResponse,
    WalletResponse,
};
use ledger_service::api::response::ApiResponse;
use ledger_service::config::Config;
use ledger_service::domain::idempotency::IdempotencyCache;
use ledger_service::infrastructure::account_registrar::PostgresAccountRegistrar;
use ledger_service::infrastructure::ledger_engine::PostgresLedgerEngine;
use ledger_service::infrastructure::persistence::{
    ledger_repository::PostgresLedgerRepository,
    payment_intent_repository::PostgresPaymentIntentRepository,
    transaction_repository::PostgresTransactionRepository,
    user_repository::PostgresUserRepository, wallet_repository::PostgresWalletRepository,
    webhook_event_repository::PostgresWebhookEventRepository,
};
use ledger_service::infrastructure::webhook_signature::HmacWebhookSignatureVerifier;
use ledger_service::jobs::maintenance::MaintenanceJob;
use ledger_service::jobs::webhook_worker::WebhookWorker;
use ledger_service::use_cases::approve_kyc::ApproveKycUseCase;
use ledger_service::use_cases::create_payment_intent::CreatePaymentIntentUseCase;
use ledger_service::use_cases::get_transaction_details::GetTransactionDetailsUseCase;
use ledger_service::use_cases::get_wallet_balance::GetWalletBalanceUseCase;
use ledger_service::use_cases::ingest_webhook::IngestWebhookUseCase;
use ledger_service::use_cases::list_transactions::ListTransactionsUseCase;
use ledger_service::use_cases::process_webhook_event::ProcessWebhookEventUseCase;
use ledger_service::use_cases::register_user::RegisterUserUseCase;
use ledger_service::use_cases::reject_kyc::RejectKycUseCase;
use ledger_service::use_cases::submit_kyc::SubmitKycUseCase;
use ledger_service::use_cases::transfer::TransferUseCase;

#[derive(OpenApi)]
#[openapi(
    paths(
        ledger_service::api::http_routes::register_user,
        ledger_service::api::http_routes::get_wallet_balance,
        ledger_service::api::http_routes::get_transaction_details,
        ledger_service::api::http_routes::create_transfer,
        ledger_service::api::http_routes::create_payment_intent,
    ),
    components(schemas(
        RegisterUserRequest,
        KycReviewRequest,
        CreateTransferRequest,
        CreatePaymentIntentRequest,
        UserResponse,
        WalletResponse,
        TransactionResponse,
        PaymentIntentResponse,
        ApiResponse<serde_json::Value>
    ))
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(tracing::Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting Ledger Service...");

    let config = Arc::new(Config::from_env()?);

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;

    info!("Connected to database");

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations applied");

    let user_repo = Arc::new(PostgresUserRepository::new(pool.clone()));
    let wallet_repo = Arc::new(PostgresWalletRepository::new(pool.clone()));
    let transaction_repo = Arc::new(PostgresTransactionRepository::new(pool.clone()));
    let ledger_repo = Arc::new(PostgresLedgerRepository::new(pool.clone()));
    let payment_intent_repo = Arc::new(PostgresPaymentIntentRepository::new(pool.clone()));
    let webhook_repo = Arc::new(PostgresWebhookEventRepository::new(pool.clone()));
    let ledger_engine = Arc::new(PostgresLedgerEngine::new(pool.clone()));
    let account_registrar = Arc::new(PostgresAccountRegistrar::new(pool.clone()));
    let webhook_verifier = Arc::new(HmacWebhookSignatureVerifier::new(config.webhook_secret.clone()));
    let idempotency_cache = Arc::new(IdempotencyCache::new(config.idempotency_timeout_seconds));

    // Wired for a future balance-audit endpoint; `GetWalletBalanceUseCase`
    // reads the wallet's cached balance column, not this aggregate.
    let _ = ledger_repo;

    let (webhook_tx, webhook_rx) = mpsc::channel(1024);

    let app_state = Arc::new(AppState {
        register_user: RegisterUserUseCase::new(account_registrar),
        submit_kyc: SubmitKycUseCase::new(user_repo.clone()),
        approve_kyc: ApproveKycUseCase::new(user_repo.clone()),
        reject_kyc: RejectKycUseCase::new(user_repo.clone()),
        get_wallet_balance: GetWalletBalanceUseCase::new(wallet_repo.clone()),
        transfer: TransferUseCase::new(
            user_repo.clone(),
            transaction_repo.clone(),
            ledger_engine.clone(),
            idempotency_cache.clone(),
            config.clone(),
        ),
        create_payment_intent: CreatePaymentIntentUseCase::new(payment_intent_repo.clone()),
        list_transactions: ListTransactionsUseCase::new(transaction_repo.clone()),
        get_transaction_details: GetTransactionDetailsUseCase::new(transaction_repo.clone()),
        ingest_webhook: IngestWebhookUseCase::new(webhook_repo.clone(), webhook_verifier, webhook_tx),
    });

    let process_webhook_event =
        ProcessWebhookEventUseCase::new(webhook_repo.clone(), payment_intent_repo, ledger_engine);
    let webhook_worker = Arc::new(WebhookWorker::new(
        webhook_repo.clone(),
        process_webhook_event,
        config.webhook_max_retries,
        config.webhook_retry_base_seconds,
    ));

    let consumer_worker = webhook_worker.clone();
    tokio::spawn(async move {
        consumer_worker.run_channel_consumer(webhook_rx).await;
    });

    let poll_worker = webhook_worker.clone();
    tokio::spawn(async move {
        poll_worker
            .run_poll_loop(std::time::Duration::from_secs(30))
            .await;
    });

    let maintenance_job = Arc::new(MaintenanceJob::new(
        webhook_repo,
        idempotency_cache,
        config.webhook_retention_days,
    ));
    tokio::spawn(async move {
        maintenance_job
            .run_loop(std::time::Duration::from_secs(3600))
            .await;
    });

    let app = routes(app_state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    let addr = format!("{}:{}", config.http_host, config.http_port);
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
