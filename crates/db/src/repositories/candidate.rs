//! Candidate repository.

use std::sync::Arc;

use crate::entities::{Candidate, candidate};
use ballotbox_common::{AppError, AppResult};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

/// Candidate repository for database operations.
#[derive(Clone)]
pub struct CandidateRepository {
    db: Arc<DatabaseConnection>,
}

impl CandidateRepository {
    /// Create a new candidate repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Every candidate standing in an election, ordered by ID.
    pub async fn find_by_election(&self, election_id: i32) -> AppResult<Vec<candidate::Model>> {
        Candidate::find()
            .filter(candidate::Column::ElectionId.eq(election_id))
            .order_by_asc(candidate::Column::Id)
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Find candidates by IDs.
    pub async fn find_by_ids(&self, ids: &[i32]) -> AppResult<Vec<candidate::Model>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        Candidate::find()
            .filter(candidate::Column::Id.is_in(ids.iter().copied()))
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
