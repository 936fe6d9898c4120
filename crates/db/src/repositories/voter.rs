//! Voter repository.

use std::sync::Arc;

use crate::entities::{Voter, voter};
use ballotbox_common::{AppError, AppResult};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

/// Voter repository for database operations.
#[derive(Clone)]
pub struct VoterRepository {
    db: Arc<DatabaseConnection>,
}

impl VoterRepository {
    /// Create a new voter repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find a voter by primary key.
    pub async fn find_by_id(&self, id: i32) -> AppResult<Option<voter::Model>> {
        Voter::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Get a voter by primary key, returning `VoterNotFound` if absent.
    pub async fn get_by_id(&self, id: i32) -> AppResult<voter::Model> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::VoterNotFound(id.to_string()))
    }

    /// Find a voter by external voter identifier.
    ///
    /// An administrator who also votes is registered under their user ID.
    pub async fn find_by_voter_id(&self, voter_id: &str) -> AppResult<Option<voter::Model>> {
        Voter::find()
            .filter(voter::Column::VoterId.eq(voter_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find a voter by session token.
    pub async fn find_by_token(&self, token: &str) -> AppResult<Option<voter::Model>> {
        Voter::find()
            .filter(voter::Column::Token.eq(token))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find voters by primary keys.
    pub async fn find_by_ids(&self, ids: &[i32]) -> AppResult<Vec<voter::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Voter::find()
            .filter(voter::Column::Id.is_in(ids.iter().copied()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Every voter, oldest first.
    pub async fn find_all(&self) -> AppResult<Vec<voter::Model>> {
        Voter::find()
            .order_by_asc(voter::Column::CreatedAt)
            .order_by_asc(voter::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn create_test_voter(id: i32, voter_id: Option<&str>) -> voter::Model {
        voter::Model {
            id,
            voter_id: voter_id.map(ToString::to_string),
            phone_number: None,
            name: format!("Voter {id}"),
            token: Some(format!("tok-{id}")),
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_find_by_voter_id() {
        let voter = create_test_voter(3, Some("admin1"));

        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[voter.clone()]])
                .into_connection(),
        );

        let repo = VoterRepository::new(db);
        let found = repo.find_by_voter_id("admin1").await.unwrap().unwrap();
        assert_eq!(found.id, 3);
    }

    #[tokio::test]
    async fn test_find_all() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_voter(1, None), create_test_voter(2, Some("S2"))]])
                .into_connection(),
        );

        let repo = VoterRepository::new(db);
        let voters = repo.find_all().await.unwrap();
        assert_eq!(voters.iter().map(|v| v.id).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<voter::Model>::new()])
                .into_connection(),
        );

        let repo = VoterRepository::new(db);
        let result = repo.get_by_id(42).await;
        assert!(matches!(result, Err(AppError::VoterNotFound(id)) if id == "42"));
    }
}
