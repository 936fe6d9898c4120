//! Bearer token authentication.

use ballotbox_common::{AppError, AppResult};
use ballotbox_db::repositories::{UserRepository, VoterRepository};

use crate::Principal;

/// Resolves bearer tokens to principals.
#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    voter_repo: VoterRepository,
}

impl AuthService {
    /// Create a new auth service.
    #[must_use]
    pub const fn new(user_repo: UserRepository, voter_repo: VoterRepository) -> Self {
        Self {
            user_repo,
            voter_repo,
        }
    }

    /// Resolve a token, trying administrator accounts before voters.
    pub async fn authenticate(&self, token: &str) -> AppResult<Principal> {
        if token.is_empty() {
            return Err(AppError::Unauthorized);
        }

        if let Some(user) = self.user_repo.find_by_token(token).await? {
            return Ok(Principal::Admin(user));
        }

        self.voter_repo
            .find_by_token(token)
            .await?
            .map(Principal::Voter)
            .ok_or(AppError::Unauthorized)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ballotbox_db::entities::{user, voter};
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::sync::Arc;

    fn test_voter() -> voter::Model {
        voter::Model {
            id: 5,
            voter_id: Some("V5".to_string()),
            phone_number: None,
            name: "Ama".to_string(),
            token: Some("voter-token".to_string()),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_falls_back_to_voter() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );
        let voter_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[test_voter()]])
                .into_connection(),
        );

        let service = AuthService::new(UserRepository::new(user_db), VoterRepository::new(voter_db));
        let principal = service.authenticate("voter-token").await.unwrap();

        assert!(!principal.is_admin());
        assert_eq!(principal.log_id(), "voter:5");
    }

    #[tokio::test]
    async fn test_unknown_token() {
        let user_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()])
                .into_connection(),
        );
        let voter_db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<voter::Model>::new()])
                .into_connection(),
        );

        let service = AuthService::new(UserRepository::new(user_db), VoterRepository::new(voter_db));
        assert!(matches!(
            service.authenticate("nope").await,
            Err(AppError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_empty_token_skips_lookup() {
        let empty = || Arc::new(MockDatabase::new(DatabaseBackend::Postgres).into_connection());
        let service = AuthService::new(UserRepository::new(empty()), VoterRepository::new(empty()));
        assert!(matches!(
            service.authenticate("").await,
            Err(AppError::Unauthorized)
        ));
    }
}
