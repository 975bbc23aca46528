use std::sync::Arc;

use common::{DomainError, UserId};

use crate::domain::entities::User;
use crate::domain::repository::UserRepository;

/// `IN_REVIEW --approve--> VERIFIED`. Restricted to staff accounts — the
/// caller's own privilege check, not a state-machine concern (§4.G).
#[derive(Clone)]
pub struct ApproveKycUseCase {
    user_repo: Arc<dyn UserRepository>,
}

impl ApproveKycUseCase {
    pub fn new(user_repo: Arc<dyn UserRepository>) -> Self {
        Self { user_repo }
    }

    #[tracing::instrument(name = "ApproveKycUseCase::execute", skip(self))]
    pub async fn execute(&self, actor: UserId, target: UserId) -> Result<User, DomainError> {
        let admin = self
            .user_repo
            .find_by_id(actor)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("user {actor}")))?;
        if !admin.is_staff() {
            return Err(DomainError::unauthorized("only staff may approve KYC submissions"));
        }

        let mut user = self
            .user_repo
            .find_by_id(target)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("user {target}")))?;

        user.approve_kyc()?;
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

    fn staff_user() -> User {
        User::reconstitute(
            UserId::new(),
            "staff@example.com".to_string(),
            KycStatus::Verified,
            true,
            true,
            None,
            None,
            chrono::Utc::now(),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn non_staff_cannot_approve() {
        let actor = User::new("customer@example.com".to_string()).unwrap();
        let actor_id = actor.id();
        let mut target = User::new("target@example.com".to_string()).unwrap();
        target.submit_kyc().unwrap();
        let target_id = target.id();

        let mut mock_repo = MockUserRepositoryImpl::new();
        mock_repo
            .expect_find_by_id()
            .withf(move |id| *id == actor_id)
            .returning(move |_| Ok(Some(actor.clone())));

        let use_case = ApproveKycUseCase::new(Arc::new(mock_repo));
        let result = use_case.execute(actor_id, target_id).await;
        assert!(matches!(result, Err(DomainError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn staff_can_approve_in_review_user() {
        let admin = staff_user();
        let admin_id = admin.id();
        let mut target = User::new("target@example.com".to_string()).unwrap();
        target.submit_kyc().unwrap();
        let target_id = target.id();

        let mut mock_repo = MockUserRepositoryImpl::new();
        mock_repo
            .expect_find_by_id()
            .withf(move |id| *id == admin_id)
            .returning(move |_| Ok(Some(admin.clone())));
        mock_repo
            .expect_find_by_id()
            .withf(move |id| *id == target_id)
            .returning(move |_| Ok(Some(target.clone())));
        mock_repo
            .expect_update()
            .withf(|u: &User| u.kyc_status() == KycStatus::Verified)
            .times(1)
            .returning(|_| Ok(()));

        let use_case = ApproveKycUseCase::new(Arc::new(mock_repo));
        let updated = use_case.execute(admin_id, target_id).await.unwrap();
        assert_eq!(updated.kyc_status(), KycStatus::Verified);
    }
}
