//! Voter registration repository.

use std::sync::Arc;

use crate::entities::{VoterElection, voter_election};
use ballotbox_common::{AppError, AppResult};
use chrono::Utc;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    sea_query::OnConflict,
};

/// Repository for the voter/election join rows.
#[derive(Clone)]
pub struct VoterElectionRepository {
    db: Arc<DatabaseConnection>,
}

impl VoterElectionRepository {
    /// Create a new voter election repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Find the registration of a voter for an election.
    pub async fn find(
        &self,
        voter_id: i32,
        election_id: i32,
    ) -> AppResult<Option<voter_election::Model>> {
        VoterElection::find()
            .filter(voter_election::Column::VoterId.eq(voter_id))
            .filter(voter_election::Column::ElectionId.eq(election_id))
            .one(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Register a voter for an election with `has_voted = false`.
    ///
    /// Returns `false` when the registration already existed; an existing row
    /// is left untouched so a cast ballot is never reset.
    pub async fn register(&self, voter_id: i32, election_id: i32) -> AppResult<bool> {
        let now = Utc::now().into();
        let model = voter_election::ActiveModel {
            voter_id: Set(voter_id),
            election_id: Set(election_id),
            has_voted: Set(false),
            created_at: Set(now),
            updated_at: Set(None),
            ..Default::default()
        };

        let inserted = VoterElection::insert(model)
            .on_conflict(
                OnConflict::columns([
                    voter_election::Column::VoterId,
                    voter_election::Column::ElectionId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))?;

        Ok(inserted > 0)
    }

    /// Registrations held by a voter, newest first.
    pub async fn find_by_voter(&self, voter_id: i32) -> AppResult<Vec<voter_election::Model>> {
        VoterElection::find()
            .filter(voter_election::Column::VoterId.eq(voter_id))
            .order_by_desc(voter_election::Column::CreatedAt)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Registrations, optionally limited to one election, oldest first.
    pub async fn find_all(&self, election_id: Option<i32>) -> AppResult<Vec<voter_election::Model>> {
        let mut query = VoterElection::find()
            .order_by_asc(voter_election::Column::CreatedAt)
            .order_by_asc(voter_election::Column::Id);

        if let Some(election_id) = election_id {
            query = query.filter(voter_election::Column::ElectionId.eq(election_id));
        }

        query
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Number of voters registered for an election.
    pub async fn count_registered(&self, election_id: i32) -> AppResult<u64> {
        VoterElection::find()
            .filter(voter_election::Column::ElectionId.eq(election_id))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Number of registered voters who have cast their ballot.
    pub async fn count_voted(&self, election_id: i32) -> AppResult<u64> {
        VoterElection::find()
            .filter(voter_election::Column::ElectionId.eq(election_id))
            .filter(voter_election::Column::HasVoted.eq(true))
            .count(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

    fn create_test_registration(voter_id: i32, has_voted: bool) -> voter_election::Model {
        voter_election::Model {
            id: voter_id,
            voter_id,
            election_id: 1,
            has_voted,
            created_at: Utc::now().into(),
            updated_at: None,
        }
    }

    #[tokio::test]
    async fn test_find_registration() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_registration(5, true)]])
                .into_connection(),
        );

        let repo = VoterElectionRepository::new(db);
        let found = repo.find(5, 1).await.unwrap().unwrap();
        assert!(found.has_voted);
    }

    #[tokio::test]
    async fn test_register_new() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .into_connection(),
        );

        let repo = VoterElectionRepository::new(db);
        assert!(repo.register(5, 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_register_existing_is_noop() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
                .into_connection(),
        );

        let repo = VoterElectionRepository::new(db);
        assert!(!repo.register(5, 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_find_all_filters_by_election() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[create_test_registration(5, true)]])
                .append_query_results([[create_test_registration(5, true)]])
                .into_connection(),
        );

        let repo = VoterElectionRepository::new(db.clone());
        assert_eq!(repo.find_all(None).await.unwrap().len(), 1);
        assert_eq!(repo.find_all(Some(1)).await.unwrap().len(), 1);
        drop(repo);

        let log = Arc::try_unwrap(db).unwrap().into_transaction_log();
        assert!(!log[0].statements()[0].sql.contains("WHERE"));
        assert!(log[1].statements()[0].sql.contains(r#""voter_election"."election_id" ="#));
    }

    #[tokio::test]
    async fn test_turnout_counts() {
        let db = Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(4)),
                }]])
                .append_query_results([[maplit::btreemap! {
                    "num_items" => sea_orm::Value::BigInt(Some(3)),
                }]])
                .into_connection(),
        );

        let repo = VoterElectionRepository::new(db);
        assert_eq!(repo.count_registered(1).await.unwrap(), 4);
        assert_eq!(repo.count_voted(1).await.unwrap(), 3);
    }
}
