use std::sync::Arc;

use common::{DomainError, Money, UserId};

use crate::domain::entities::PaymentIntent;
use crate::domain::repository::PaymentIntentRepository;

/// Starts a gateway-side deposit intent (§4.H). The intent stays `PENDING`
/// until the webhook pipeline reports success or failure — this use case
/// never touches a wallet.
#[derive(Clone)]
pub struct CreatePaymentIntentUseCase {
    payment_intent_repo: Arc<dyn PaymentIntentRepository>,
}

impl CreatePaymentIntentUseCase {
    pub fn new(payment_intent_repo: Arc<dyn PaymentIntentRepository>) -> Self {
        Self { payment_intent_repo }
    }

    #[tracing::instrument(name = "CreatePaymentIntentUseCase::execute", skip(self))]
    pub async fn execute(
        &self,
        user_id: UserId,
        amount: Money,
        currency: String,
        description: Option<String>,
    ) -> Result<PaymentIntent, DomainError> {
        if !amount.is_positive() {
            return Err(DomainError::invalid_transaction("amount must be positive"));
        }
        let intent = PaymentIntent::new(user_id, amount, currency, description);
        self.payment_intent_repo.create(&intent).await?;
        Ok(intent)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use common::PaymentIntentId;
    use mockall::mock;

    use super::*;

    mock! {
        pub PaymentIntentRepositoryImpl {}

        #[async_trait]
        impl PaymentIntentRepository for PaymentIntentRepositoryImpl {
            async fn find_by_id(&self, id: PaymentIntentId) -> Result<Option<PaymentIntent>, DomainError>;
            async fn find_by_gateway_payment_id(&self, gateway_payment_id: &str) -> Result<Option<PaymentIntent>, DomainError>;
            async fn create(&self, intent: &PaymentIntent) -> Result<(), DomainError>;
            async fn update(&self, intent: &PaymentIntent) -> Result<(), DomainError>;
        }
    }

    #[tokio::test]
    async fn creates_a_pending_intent() {
        let mut repo = MockPaymentIntentRepositoryImpl::new();
        repo.expect_create().times(1).returning(|_| Ok(()));

        let use_case = CreatePaymentIntentUseCase::new(Arc::new(repo));
        let intent = use_case
            .execute(UserId::new(), Money::parse("25.00").unwrap(), "INR".to_string(), None)
            .await
            .unwrap();

        assert_eq!(intent.amount(), Money::parse("25.00").unwrap());
        assert!(intent.gateway_payment_id().starts_with("PAY-"));
    }

    #[tokio::test]
    async fn rejects_zero_amount() {
        let repo = MockPaymentIntentRepositoryImpl::new();
        let use_case = CreatePaymentIntentUseCase::new(Arc::new(repo));
        let result = use_case
            .execute(UserId::new(), Money::ZERO, "INR".to_string(), None)
            .await;
        assert!(result.is_err());
    }
}
