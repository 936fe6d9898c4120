//! Ballot write path.
//!
//! A ballot is recorded in a single transaction: the voter's `has_voted` gate
//! is checked under a row lock, flipped through a conflict-guarded upsert, and
//! the decision log and countable votes are appended. Either every row lands
//! or none does.

use std::sync::Arc;

use crate::entities::{
    Vote, VoteAction, Voter, VoterElection, vote,
    vote_action::{self, ActionType},
    voter_election,
};
use ballotbox_common::{AppError, AppResult};
use chrono::Utc;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait,
    sea_query::{Expr, OnConflict},
};
use tracing::{debug, error, warn};

/// One validated ballot entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BallotDecision {
    /// Portfolio the decision applies to.
    pub portfolio_id: i32,
    /// Chosen candidate; always `None` for a skip.
    pub candidate_id: Option<i32>,
    /// Vote or skip.
    pub action_type: ActionType,
}

/// Rows written by a committed ballot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordedBallot {
    /// Decision log rows appended (one per entry).
    pub actions_recorded: usize,
    /// Countable votes appended (one per `VOTE` entry).
    pub votes_recorded: usize,
}

/// Repository owning the transactional ballot write.
#[derive(Clone)]
pub struct BallotRepository {
    db: Arc<DatabaseConnection>,
}

impl BallotRepository {
    /// Create a new ballot repository.
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Record a ballot for `voter_id` in `election_id`, at most once.
    ///
    /// Fails with `DuplicateVote` when the voter already voted, including when
    /// a concurrent submission wins the gate first. Storage failures roll back
    /// and surface as `TransactionFailed`. A failed commit surfaces as
    /// `TransactionOutcomeUnknown`, since the server may have applied it.
    pub async fn record(
        &self,
        voter_id: i32,
        election_id: i32,
        decisions: &[BallotDecision],
    ) -> AppResult<RecordedBallot> {
        let txn = self
            .db
            .begin()
            .await
            .map_err(|e| storage_failure(&e, voter_id, election_id))?;

        match write_ballot(&txn, voter_id, election_id, decisions).await {
            Ok(recorded) => {
                txn.commit()
                    .await
                    .map_err(|e| commit_failure(&e, voter_id, election_id))?;
                Ok(recorded)
            }
            Err(err) => {
                if let Err(e) = txn.rollback().await {
                    warn!(error = %e, voter_id, election_id, "Ballot rollback failed");
                }
                Err(err)
            }
        }
    }
}

async fn write_ballot(
    txn: &DatabaseTransaction,
    voter_id: i32,
    election_id: i32,
    decisions: &[BallotDecision],
) -> AppResult<RecordedBallot> {
    let fail = |e: DbErr| storage_failure(&e, voter_id, election_id);

    Voter::find_by_id(voter_id)
        .one(txn)
        .await
        .map_err(fail)?
        .ok_or_else(|| AppError::VoterNotFound(voter_id.to_string()))?;

    let existing = VoterElection::find()
        .filter(voter_election::Column::VoterId.eq(voter_id))
        .filter(voter_election::Column::ElectionId.eq(election_id))
        .lock_exclusive()
        .one(txn)
        .await
        .map_err(fail)?;

    if existing.is_some_and(|row| row.has_voted) {
        debug!(voter_id, election_id, "Rejected repeat ballot");
        return Err(AppError::DuplicateVote);
    }

    let now = Utc::now().into();

    // Only a row still at has_voted = false may be flipped; a concurrent
    // winner leaves zero affected rows.
    let gate = voter_election::ActiveModel {
        voter_id: Set(voter_id),
        election_id: Set(election_id),
        has_voted: Set(true),
        created_at: Set(now),
        updated_at: Set(Some(now)),
        ..Default::default()
    };
    let flipped = VoterElection::insert(gate)
        .on_conflict(
            OnConflict::columns([
                voter_election::Column::VoterId,
                voter_election::Column::ElectionId,
            ])
            .update_columns([
                voter_election::Column::HasVoted,
                voter_election::Column::UpdatedAt,
            ])
            .action_and_where(
                Expr::col((VoterElection, voter_election::Column::HasVoted)).eq(false),
            )
            .to_owned(),
        )
        .exec_without_returning(txn)
        .await
        .map_err(|e| gate_failure(e, voter_id, election_id))?;

    if flipped == 0 {
        debug!(voter_id, election_id, "Lost has_voted race to a concurrent ballot");
        return Err(AppError::DuplicateVote);
    }

    let actions = decisions.iter().map(|d| vote_action::ActiveModel {
        voter_id: Set(voter_id),
        election_id: Set(election_id),
        portfolio_id: Set(d.portfolio_id),
        candidate_id: Set(match d.action_type {
            ActionType::Vote => d.candidate_id,
            ActionType::Skip => None,
        }),
        action_type: Set(d.action_type),
        created_at: Set(now),
        ..Default::default()
    });
    VoteAction::insert_many(actions)
        .exec_without_returning(txn)
        .await
        .map_err(fail)?;

    let votes: Vec<vote::ActiveModel> = decisions
        .iter()
        .filter(|d| d.action_type == ActionType::Vote)
        .filter_map(|d| d.candidate_id)
        .map(|candidate_id| vote::ActiveModel {
            voter_id: Set(voter_id),
            candidate_id: Set(candidate_id),
            election_id: Set(election_id),
            created_at: Set(now),
            ..Default::default()
        })
        .collect();
    let votes_recorded = votes.len();

    if !votes.is_empty() {
        Vote::insert_many(votes)
            .exec_without_returning(txn)
            .await
            .map_err(fail)?;
    }

    Ok(RecordedBallot {
        actions_recorded: decisions.len(),
        votes_recorded,
    })
}

/// A unique violation on the gate means another transaction inserted the
/// registration row between our read and our upsert.
fn gate_failure(err: DbErr, voter_id: i32, election_id: i32) -> AppError {
    if matches!(err.sql_err(), Some(sea_orm::SqlErr::UniqueConstraintViolation(_))) {
        debug!(voter_id, election_id, "has_voted gate hit a unique violation");
        return AppError::DuplicateVote;
    }
    storage_failure(&err, voter_id, election_id)
}

fn storage_failure(err: &DbErr, voter_id: i32, election_id: i32) -> AppError {
    error!(error = %err, voter_id, election_id, "Ballot transaction failed");
    AppError::TransactionFailed(err.to_string())
}

fn commit_failure(err: &DbErr, voter_id: i32, election_id: i32) -> AppError {
    error!(error = %err, voter_id, election_id, "Ballot commit failed, outcome unknown");
    AppError::TransactionOutcomeUnknown(err.to_string())
}
