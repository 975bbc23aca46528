use std::sync::Arc;

use common::{DomainError, WebhookEventId};
use tracing::warn;

use crate::domain::entities::{PaymentIntentStatus, WebhookEvent};
use crate::domain::repository::{DepositCommand, LedgerEngine, PaymentIntentRepository, WebhookEventRepository};

/// The background worker's per-event logic (§4.J). Called both from the
/// `tokio::sync::mpsc` queue consumer and from the durable poll fallback,
/// so this use case is itself idempotent: re-running it against an
/// already-`Processed` event is a no-op.
#[derive(Clone)]
pub struct ProcessWebhookEventUseCase {
    webhook_repo: Arc<dyn WebhookEventRepository>,
    payment_intent_repo: Arc<dyn PaymentIntentRepository>,
    ledger_engine: Arc<dyn LedgerEngine>,
}

impl ProcessWebhookEventUseCase {
    pub fn new(
        webhook_repo: Arc<dyn WebhookEventRepository>,
        payment_intent_repo: Arc<dyn PaymentIntentRepository>,
        ledger_engine: Arc<dyn LedgerEngine>,
    ) -> Self {
        Self {
            webhook_repo,
            payment_intent_repo,
            ledger_engine,
        }
    }

    #[tracing::instrument(name = "ProcessWebhookEventUseCase::execute", skip(self))]
    pub async fn execute(&self, event_id: WebhookEventId) -> Result<(), DomainError> {
        let Some(mut event) = self.lookup(event_id).await? else {
            return Ok(());
        };
        if event.is_terminal() {
            return Ok(());
        }
        event.mark_processing();
        self.webhook_repo.update(&event).await?;

        match self.dispatch(&event).await {
            Ok(()) => {
                event.mark_processed();
                self.webhook_repo.update(&event).await
            }
            Err(err) => {
                event.mark_failed(err.to_string());
                self.webhook_repo.update(&event).await?;
                Err(err)
            }
        }
    }

    async fn lookup(&self, event_id: WebhookEventId) -> Result<Option<WebhookEvent>, DomainError> {
        // find_by_event_id is keyed by the gateway's event_id string, not
        // our own row id, so we scan retryable rows for a match — the
        // background poller already loads this same small backlog. A
        // caller reaching this use case (channel nudge or poll) has
        // already decided this specific event should run now, so the
        // backoff gate is passed as 0 rather than re-applied here.
        let candidates = self.webhook_repo.find_retryable(i32::MAX, 0, 1000).await?;
        Ok(candidates.into_iter().find(|e| e.id == event_id))
    }

    async fn dispatch(&self, event: &WebhookEvent) -> Result<(), DomainError> {
        match event.event_type.as_str() {
            "payment.succeeded" => self.handle_payment_succeeded(event).await,
            "payment.failed" => self.handle_payment_failed(event).await,
            other => {
                warn!(event_type = other, "unrecognized webhook event type, acking without action");
                Ok(())
            }
        }
    }

    async fn handle_payment_succeeded(&self, event: &WebhookEvent) -> Result<(), DomainError> {
        let gateway_payment_id = event
            .payload
            .get("gateway_payment_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| DomainError::invalid_transaction("missing gateway_payment_id in payload"))?;

        let mut intent = self
            .payment_intent_repo
            .find_by_gateway_payment_id(gateway_payment_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("payment intent {gateway_payment_id}")))?;

        if intent.status() == PaymentIntentStatus::Succeeded {
            return Ok(());
        }

        let reference_id = intent.deposit_reference_id();
        self.ledger_engine
            .deposit(DepositCommand {
                reference_id,
                to_user: intent.user_id(),
                amount: intent.amount(),
                description: intent.description().map(str::to_string),
            })
            .await?;

        intent.mark_succeeded(event.payload.clone());
        self.payment_intent_repo.update(&intent).await
    }

    async fn handle_payment_failed(&self, event: &WebhookEvent) -> Result<(), DomainError> {
        let gateway_payment_id = event
            .payload
            .get("gateway_payment_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| DomainError::invalid_transaction("missing gateway_payment_id in payload"))?;

        let mut intent = self
            .payment_intent_repo
            .find_by_gateway_payment_id(gateway_payment_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("payment intent {gateway_payment_id}")))?;

        let reason = event
            .payload
            .get("error_message")
            .and_then(|v| v.as_str())
            .unwrap_or("gateway reported failure")
            .to_string();
        intent.mark_failed(reason);
        self.payment_intent_repo.update(&intent).await
    }
}
