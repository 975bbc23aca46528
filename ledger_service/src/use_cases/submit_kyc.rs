use std::sync::Arc;

use common::{DomainError, UserId};

use crate::domain::entities::User;
use crate::domain::repository::UserRepository;

/// `PENDING|IN_REVIEW|REJECTED|EXPIRED --submit--> IN_REVIEW` (§4.G).
#[derive(Clone)]
pub struct SubmitKycUseCase {
    user_repo: Arc<dyn UserRepository>,
}

impl SubmitKycUseCase {
    pub fn new(user_repo: Arc<dyn UserRepository>) -> Self {
        Self { user_repo }
    }

    #[tracing::instrument(name = "SubmitKycUseCase::execute", skip(self))]
    pub async fn execute(&self, user_id: UserId) -> Result<User, DomainError> {
        let mut user = self
            .user_repo
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("user {user_id}")))?;

        user.submit_kyc()?;
        self.user_repo.update(&user).await?;
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use mockall::mock;

    use super::*;
    use crate::domain::entities::KycStatus;

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

    #[tokio::test]
    async fn moves_pending_user_to_in_review() {
        let user = User::new("a@example.com".to_string()).unwrap();
        let id = user.id();

        let mut mock_repo = MockUserRepositoryImpl::new();
        mock_repo
            .expect_find_by_id()
            .times(1)
            .returning(move |_| Ok(Some(user.clone())));
        mock_repo
            .expect_update()
            .withf(|u: &User| u.kyc_status() == KycStatus::InReview)
            .times(1)
            .returning(|_| Ok(()));

        let use_case = SubmitKycUseCase::new(Arc::new(mock_repo));
        let updated = use_case.execute(id).await.unwrap();
        assert_eq!(updated.kyc_status(), KycStatus::InReview);
    }

    #[tokio::test]
    async fn rejects_unknown_user() {
        let mut mock_repo = MockUserRepositoryImpl::new();
        mock_repo.expect_find_by_id().returning(|_| Ok(None));

        let use_case = SubmitKycUseCase::new(Arc::new(mock_repo));
        let result = use_case.execute(UserId::new()).await;
        assert!(matches!(result, Err(DomainError::NotFound(_))));
    }
}
