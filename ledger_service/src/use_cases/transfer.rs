use std::sync::Arc;

use common::{DomainError, Money, UserId};

use crate::config::Config;
use crate::domain::entities::{generate_transaction_reference_id, Transaction};
use crate::domain::idempotency::IdempotencyCache;
use crate::domain::repository::{LedgerEngine, TransactionRepository, TransferCommand, UserRepository};

/// Caller-supplied input for `TransferUseCase::execute`. `reference_id` is
/// the client's idempotency key when provided; a fresh `TXN-...` id is
/// generated otherwise (§4.E).
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub reference_id: Option<String>,
    pub from_user: UserId,
    pub to_user: UserId,
    pub amount: Money,
    pub description: Option<String>,
}

/// The Transfer Engine's application-layer face (§4.F, THE CORE). Resolves
/// idempotency, checks KYC/active preconditions and the configured amount
/// range, then delegates the atomic cross-table work to `LedgerEngine`.
#[derive(Clone)]
pub struct TransferUseCase {
    user_repo: Arc<dyn UserRepository>,
    transaction_repo: Arc<dyn TransactionRepository>,
    ledger_engine: Arc<dyn LedgerEngine>,
    idempotency_cache: Arc<IdempotencyCache>,
    config: Arc<Config>,
}

impl TransferUseCase {
    pub fn new(
        user_repo: Arc<dyn UserRepository>,
        transaction_repo: Arc<dyn TransactionRepository>,
        ledger_engine: Arc<dyn LedgerEngine>,
        idempotency_cache: Arc<IdempotencyCache>,
        config: Arc<Config>,
    ) -> Self {
        Self {
            user_repo,
            transaction_repo,
            ledger_engine,
            idempotency_cache,
            config,
        }
    }

    #[tracing::instrument(name = "TransferUseCase::execute", skip(self, request))]
    pub async fn execute(&self, request: TransferRequest) -> Result<Transaction, DomainError> {
        let reference_id = request
            .reference_id
            .unwrap_or_else(generate_transaction_reference_id);

        // Fast path: in-process cache hit, then the authoritative unique
        // index, before doing anything that touches two wallets (§4.E).
        if let Some(transaction_id) = self.idempotency_cache.get(&reference_id).await {
            if let Some(existing) = self.transaction_repo.find_by_id(transaction_id).await? {
                return Ok(existing);
            }
        }
        if let Some(existing) = self
            .transaction_repo
            .find_by_reference_id(&reference_id)
            .await?
        {
            self.idempotency_cache.put(reference_id, existing.id).await;
            return Ok(existing);
        }

        if request.from_user == request.to_user {
            return Err(DomainError::invalid_transaction("cannot transfer to the same account"));
        }
        if request.amount < self.config.min_transaction_amount {
            return Err(DomainError::invalid_transaction(format!(
                "amount below minimum of {}",
                self.config.min_transaction_amount
            )));
        }
        if request.amount > self.config.max_transaction_amount {
            return Err(DomainError::invalid_transaction(format!(
                "amount above maximum of {}",
                self.config.max_transaction_amount
            )));
        }

        self.ensure_can_transact(request.from_user).await?;
        self.ensure_can_transact(request.to_user).await?;

        let transaction = self
            .ledger_engine
            .transfer(TransferCommand {
                reference_id: reference_id.clone(),
                from_user: request.from_user,
                to_user: request.to_user,
                amount: request.amount,
                description: request.description,
            })
            .await?;

        self.idempotency_cache.put(reference_id, transaction.id).await;
        Ok(transaction)
    }

    async fn ensure_can_transact(&self, user_id: UserId) -> Result<(), DomainError> {
        let user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("user {user_id}")))?;
        if !user.can_transact() {
            return Err(DomainError::unauthorized(format!(
                "user {user_id} is not eligible to transact (KYC or account status)"
            )));
        }
        Ok(())
    }
}
