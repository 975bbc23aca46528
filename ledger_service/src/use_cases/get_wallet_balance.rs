use std::sync::Arc;

use common::{DomainError, UserId};

use crate::domain::entities::Wallet;
use crate::domain::repository::WalletRepository;

#[derive(Clone)]
pub struct GetWalletBalanceUseCase {
    wallet_repo: Arc<dyn WalletRepository>,
}

impl GetWalletBalanceUseCase {
    pub fn new(wallet_repo: Arc<dyn WalletRepository>) -> Self {
        Self { wallet_repo }
    }

    #[tracing::instrument(name = "GetWalletBalanceUseCase::execute", skip(self))]
    pub async fn execute(&self, user_id: UserId) -> Result<Wallet, DomainError> {
        self.wallet_repo
            .find_by_user_id(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("wallet for user {user_id}")))
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use common::{Money, WalletId};
    use mockall::mock;

    use super::*;

    mock! {
        pub WalletRepositoryImpl {}

        #[async_trait]
        impl WalletRepository for WalletRepositoryImpl {
            async fn find_by_user_id(&self, user_id: UserId) -> Result<Option<Wallet>, DomainError>;
            async fn find_by_id(&self, id: WalletId) -> Result<Option<Wallet>, DomainError>;
            async fn create(&self, wallet: &Wallet) -> Result<(), DomainError>;
        }
    }

    #[tokio::test]
    async fn returns_wallet_for_known_user() {
        let user_id = UserId::new();
        let wallet = Wallet::reconstitute(
            WalletId::new(),
            user_id,
            Money::parse("42.50").unwrap(),
            chrono::Utc::now(),
        );

        let mut mock_repo = MockWalletRepositoryImpl::new();
        mock_repo
            .expect_find_by_user_id()
            .times(1)
            .returning(move |_| Ok(Some(wallet.clone())));

        let use_case = GetWalletBalanceUseCase::new(Arc::new(mock_repo));
        let found = use_case.execute(user_id).await.unwrap();
        assert_eq!(found.balance(), Money::parse("42.50").unwrap());
    }

    #[tokio::test]
    async fn missing_wallet_is_not_found() {
        let mut mock_repo = MockWalletRepositoryImpl::new();
        mock_repo.expect_find_by_user_id().returning(|_| Ok(None));

        let use_case = GetWalletBalanceUseCase::new(Arc::new(mock_repo));
        let result = use_case.execute(UserId::new()).await;
        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }
}
