use std::sync::Arc;

use common::DomainError;

use crate::domain::entities::{User, Wallet};
use crate::domain::repository::AccountRegistrar;

/// Onboards a new account. Delegates the actual insert to `AccountRegistrar`
/// so the user row and its zero-balance wallet land in one transaction
/// instead of two independently-failing writes.
#[derive(Clone)]
pub struct RegisterUserUseCase {
    registrar: Arc<dyn AccountRegistrar>,
}

impl RegisterUserUseCase {
    pub fn new(registrar: Arc<dyn AccountRegistrar>) -> Self {
        Self { registrar }
    }

    #[tracing::instrument(name = "RegisterUserUseCase::execute", skip(self))]
    pub async fn execute(&self, email: String) -> Result<(User, Wallet), DomainError> {
        self.registrar.register(email).await
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use mockall::mock;

    use super::*;

    mock! {
        pub AccountRegistrarImpl {}

        #[async_trait]
        impl AccountRegistrar for AccountRegistrarImpl {
            async fn register(&self, email: String) -> Result<(User, Wallet), DomainError>;
        }
    }

    #[tokio::test]
    async fn registers_a_new_account() {
        let mut mock_registrar = MockAccountRegistrarImpl::new();
        mock_registrar.expect_register().times(1).returning(|email| {
            let user = User::new(email)?;
            let wallet = Wallet::open(user.id());
            Ok((user, wallet))
        });

        let use_case = RegisterUserUseCase::new(Arc::new(mock_registrar));
        let (user, wallet) = use_case.execute("new@example.com".to_string()).await.unwrap();
        assert_eq!(user.email(), "new@example.com");
        assert_eq!(wallet.user_id(), user.id());
        assert!(wallet.balance().is_zero());
    }

    #[tokio::test]
    async fn propagates_validation_errors() {
        let mut mock_registrar = MockAccountRegistrarImpl::new();
        mock_registrar
            .expect_register()
            .times(1)
            .returning(|email| Ok((User::new(email)?, Wallet::open(Default::default()))));

        let use_case = RegisterUserUseCase::new(Arc::new(mock_registrar));
        let result = use_case.execute("not-an-email".to_string()).await;
        assert!(result.is_err());
    }
}
