//! Ballot decision log repository.

use std::sync::Arc;

use crate::entities::{
    VoteAction,
    vote_action::{self, ActionType},
};
use ballotbox_common::{AppError, AppResult};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, FromQueryResult, QueryFilter, QueryOrder,
    QuerySelect,
};

/// Number of identical decisions taken on a portfolio.
#[derive(Debug, Clone, PartialEq, Eq, FromQueryResult)]
pub struct DecisionCount {
    /// Portfolio the decisions were taken on.
    pub portfolio_id: i32,
    /// Chosen candidate; `None` for skips.
    pub candidate_id: Option<i32>,
    /// Vote or skip.
    pub action_type: ActionType,
    /// How many voters took this decision.
    pub decisions: i64,
}

/// Repository for the append-only decision log.
#[derive(Clone)]
pub struct VoteActionRepository {
    db: Arc<DatabaseConnection>,
}

impl VoteActionRepository {
    /// Create a new vote action repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Decisions recorded for an election, newest first.
    ///
    /// `until_id` pages backwards: only decisions older than it are returned.
    pub async fn find_by_election(
        &self,
        election_id: i32,
        limit: u64,
        until_id: Option<i32>,
    ) -> AppResult<Vec<vote_action::Model>> {
        let mut query = VoteAction::find()
            .filter(vote_action::Column::ElectionId.eq(election_id))
            .order_by_desc(vote_action::Column::Id)
            .limit(limit);

        if let Some(until) = until_id {
            query = query.filter(vote_action::Column::Id.lt(until));
        }

        query
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Every decision, optionally limited to one election, oldest first.
    pub async fn find_all(&self, election_id: Option<i32>) -> AppResult<Vec<vote_action::Model>> {
        let mut query = VoteAction::find()
            .order_by_asc(vote_action::Column::CreatedAt)
            .order_by_asc(vote_action::Column::Id);

        if let Some(election_id) = election_id {
            query = query.filter(vote_action::Column::ElectionId.eq(election_id));
        }

        query
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }

    /// Decisions of an election grouped by portfolio, candidate and action.
    pub async fn decision_counts(&self, election_id: i32) -> AppResult<Vec<DecisionCount>> {
        VoteAction::find()
            .select_only()
            .column(vote_action::Column::PortfolioId)
            .column(vote_action::Column::CandidateId)
            .column(vote_action::Column::ActionType)
            .column_as(vote_action::Column::Id.count(), "decisions")
            .filter(vote_action::Column::ElectionId.eq(election_id))
            .group_by(vote_action::Column::PortfolioId)
            .group_by(vote_action::Column::CandidateId)
            .group_by(vote_action::Column::ActionType)
            .into_model::<DecisionCount>()
            .all(self.db.as_ref())
            .await
            .map_err(|e| AppError::Database(e.to_string()))
    }
}
