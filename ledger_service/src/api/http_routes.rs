use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use common::{Money, PaymentIntentId, TransactionId, UserId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::ApiError;
use crate::api::response::ApiResponse;
use crate::domain::entities::{PaymentIntent, Transaction, User, Wallet};
use crate::use_cases::approve_kyc::ApproveKycUseCase;
use crate::use_cases::create_payment_intent::CreatePaymentIntentUseCase;
use crate::use_cases::get_transaction_details::GetTransactionDetailsUseCase;
use crate::use_cases::get_wallet_balance::GetWalletBalanceUseCase;
use crate::use_cases::ingest_webhook::IngestWebhookUseCase;
use crate::use_cases::list_transactions::ListTransactionsUseCase;
use crate::use_cases::register_user::RegisterUserUseCase;
use crate::use_cases::reject_kyc::RejectKycUseCase;
use crate::use_cases::submit_kyc::SubmitKycUseCase;
use crate::use_cases::transfer::{TransferRequest, TransferUseCase};

/// Shared application state: one `Arc<AppState>` handed to every Axum
/// handler, each field a thin, cloneable use-case wrapper over its
/// repositories (§4.N).
pub struct AppState {
    pub register_user: RegisterUserUseCase,
    pub submit_kyc: SubmitKycUseCase,
    pub approve_kyc: ApproveKycUseCase,
    pub reject_kyc: RejectKycUseCase,
    pub get_wallet_balance: GetWalletBalanceUseCase,
    pub transfer: TransferUseCase,
    pub create_payment_intent: CreatePaymentIntentUseCase,
    pub list_transactions: ListTransactionsUseCase,
    pub get_transaction_details: GetTransactionDetailsUseCase,
    pub ingest_webhook: IngestWebhookUseCase,
}

pub fn routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/users", post(register_user))
        .route("/users/{user_id}/kyc/submit", post(submit_kyc))
        .route("/users/{user_id}/kyc/approve", post(approve_kyc))
        .route("/users/{user_id}/kyc/reject", post(reject_kyc))
        .route("/users/{user_id}/wallet", get(get_wallet_balance))
        .route("/users/{user_id}/transactions", get(list_transactions))
        .route("/transfers", post(create_transfer))
        .route("/payment-intents", post(create_payment_intent))
        .route("/transactions/{transaction_id}", get(get_transaction_details))
        .route("/webhooks/payment-gateway", post(receive_webhook))
        .with_state(state)
}

#[derive(Deserialize, ToSchema)]
pub struct RegisterUserRequest {
    pub email: String,
}

#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    pub id: UserId,
    pub email: String,
    pub kyc_status: String,
    pub active: bool,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id(),
            email: user.email().to_string(),
            kyc_status: format!("{:?}", user.kyc_status()),
            active: user.active(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct WalletResponse {
    pub user_id: UserId,
    pub balance: Money,
}

impl From<&Wallet> for WalletResponse {
    fn from(wallet: &Wallet) -> Self {
        Self {
            user_id: wallet.user_id(),
            balance: wallet.balance(),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct TransactionResponse {
    pub id: TransactionId,
    pub reference_id: String,
    pub from_user_id: Option<UserId>,
    pub to_user_id: Option<UserId>,
    pub amount: Money,
    pub status: String,
    pub transaction_type: String,
}

impl From<&Transaction> for TransactionResponse {
    fn from(txn: &Transaction) -> Self {
        Self {
            id: txn.id,
            reference_id: txn.reference_id.clone(),
            from_user_id: txn.from_user_id,
            to_user_id: txn.to_user_id,
            amount: txn.amount,
            status: format!("{:?}", txn.status),
            transaction_type: format!("{:?}", txn.transaction_type),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct PaymentIntentResponse {
    pub id: PaymentIntentId,
    pub gateway_payment_id: String,
    pub amount: Money,
    pub status: String,
}

impl From<&PaymentIntent> for PaymentIntentResponse {
    fn from(intent: &PaymentIntent) -> Self {
        Self {
            id: intent.id(),
            gateway_payment_id: intent.gateway_payment_id().to_string(),
            amount: intent.amount(),
            status: format!("{:?}", intent.status()),
        }
    }
}

#[utoipa::path(post, path = "/users", request_body = RegisterUserRequest, responses((status = 200, body = ApiResponse<UserResponse>)))]
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let (user, _wallet) = state.register_user.execute(payload.email).await?;
    Ok(Json(ApiResponse::success(UserResponse::from(&user))))
}

pub async fn submit_kyc(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user = state.submit_kyc.execute(user_id).await?;
    Ok(Json(ApiResponse::success(UserResponse::from(&user))))
}

#[derive(Deserialize, ToSchema)]
pub struct KycReviewRequest {
    pub actor_id: UserId,
}

pub async fn approve_kyc(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
    Json(payload): Json<KycReviewRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user = state.approve_kyc.execute(payload.actor_id, user_id).await?;
    Ok(Json(ApiResponse::success(UserResponse::from(&user))))
}

pub async fn reject_kyc(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
    Json(payload): Json<KycReviewRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    let user = state.reject_kyc.execute(payload.actor_id, user_id).await?;
    Ok(Json(ApiResponse::success(UserResponse::from(&user))))
}

#[utoipa::path(get, path = "/users/{user_id}/wallet", responses((status = 200, body = ApiResponse<WalletResponse>)))]
pub async fn get_wallet_balance(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> Result<Json<ApiResponse<WalletResponse>>, ApiError> {
    let wallet = state.get_wallet_balance.execute(user_id).await?;
    Ok(Json(ApiResponse::success(WalletResponse::from(&wallet))))
}

pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<UserId>,
) -> Result<Json<ApiResponse<Vec<TransactionResponse>>>, ApiError> {
    let transactions = state.list_transactions.execute(user_id).await?;
    let response = transactions.iter().map(TransactionResponse::from).collect();
    Ok(Json(ApiResponse::success(response)))
}

#[utoipa::path(get, path = "/transactions/{transaction_id}", responses((status = 200, body = ApiResponse<TransactionResponse>)))]
pub async fn get_transaction_details(
    State(state): State<Arc<AppState>>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<ApiResponse<TransactionResponse>>, ApiError> {
    let transaction = state.get_transaction_details.execute(transaction_id).await?;
    Ok(Json(ApiResponse::success(TransactionResponse::from(&transaction))))
}

#[derive(Deserialize, ToSchema)]
pub struct CreateTransferRequest {
    pub reference_id: Option<String>,
    pub from_user: UserId,
    pub to_user: UserId,
    pub amount: Money,
    pub description: Option<String>,
}

#[utoipa::path(post, path = "/transfers", request_body = CreateTransferRequest, responses((status = 200, body = ApiResponse<TransactionResponse>)))]
pub async fn create_transfer(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateTransferRequest>,
) -> Result<Json<ApiResponse<TransactionResponse>>, ApiError> {
    let transaction = state
        .transfer
        .execute(TransferRequest {
            reference_id: payload.reference_id,
            from_user: payload.from_user,
            to_user: payload.to_user,
            amount: payload.amount,
            description: payload.description,
        })
        .await?;
    Ok(Json(ApiResponse::success(TransactionResponse::from(&transaction))))
}

#[derive(Deserialize, ToSchema)]
pub struct CreatePaymentIntentRequest {
    pub user_id: UserId,
    pub amount: Money,
    pub currency: String,
    pub description: Option<String>,
}

#[utoipa::path(post, path = "/payment-intents", request_body = CreatePaymentIntentRequest, responses((status = 200, body = ApiResponse<PaymentIntentResponse>)))]
pub async fn create_payment_intent(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreatePaymentIntentRequest>,
) -> Result<Json<ApiResponse<PaymentIntentResponse>>, ApiError> {
    let intent = state
        .create_payment_intent
        .execute(payload.user_id, payload.amount, payload.currency, payload.description)
        .await?;
    Ok(Json(ApiResponse::success(PaymentIntentResponse::from(&intent))))
}

/// Gateway callback receiver (§4.I). Takes the raw body so the HMAC
/// verifier hashes exactly what the gateway signed, never a
/// re-serialized `Json<T>` extraction.
pub async fn receive_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let signature = headers
        .get("X-Gateway-Signature")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    let payload: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|_| ApiError(common::DomainError::invalid_transaction("malformed webhook payload")))?;

    let event_id = payload
        .get("event_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ApiError(common::DomainError::invalid_transaction("missing event_id")))?
        .to_string();
    let event_type = payload
        .get("event_type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| ApiError(common::DomainError::invalid_transaction("missing event_type")))?
        .to_string();

    state
        .ingest_webhook
        .execute(&body, signature, event_id, event_type, payload)
        .await?;

    Ok(StatusCode::ACCEPTED)
}
