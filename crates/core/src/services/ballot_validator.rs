//! Ballot validation.
//!
//! Checks a submitted ballot against a snapshot of the election directory and
//! normalises it into the decisions the ballot transaction writes. Nothing
//! here touches storage.

use std::collections::{HashMap, HashSet};

use ballotbox_common::{AppError, AppResult};
use ballotbox_db::{
    entities::{
        candidate, election,
        election::ElectionStatus,
        portfolio,
        vote_action::ActionType,
    },
    repositories::BallotDecision,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use validator::Validate;

/// One entry of a submitted ballot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotEntry {
    pub portfolio_id: i32,
    #[serde(default)]
    pub candidate_id: Option<i32>,
    /// Defaults to `VOTE` when omitted.
    #[serde(default)]
    pub action_type: Option<ActionType>,
}

/// A ballot submission.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBallotInput {
    pub election_id: i32,
    /// Bounded by the election's portfolio count during validation.
    #[validate(length(min = 1, message = "a ballot needs at least one decision"))]
    pub votes: Vec<BallotEntry>,
}

/// Directory state a ballot is validated against.
#[derive(Debug, Clone)]
pub struct BallotDirectory {
    pub election: election::Model,
    pub portfolios: Vec<portfolio::Model>,
    pub candidates: Vec<candidate::Model>,
}

/// Fail unless `election` is `IN_PROGRESS` and `now` lies inside its window.
///
/// A window whose start is not before its end never admits a ballot.
pub fn ensure_open(election: &election::Model, now: DateTime<Utc>) -> AppResult<()> {
    if election.status != ElectionStatus::InProgress {
        return Err(AppError::ElectionNotActive(
            election.status.as_str().to_string(),
        ));
    }
    if !election.window_is_valid() {
        warn!(election_id = election.id, "Election window starts at or after its end");
        return Err(AppError::ElectionWindowClosed);
    }
    if !election.is_open_at(now) {
        return Err(AppError::ElectionWindowClosed);
    }
    Ok(())
}

impl BallotDirectory {
    /// Validate `entries` and return them normalised.
    ///
    /// The whole ballot is checked before anything is returned, so a single
    /// bad entry rejects the submission.
    pub fn validate(
        &self,
        entries: &[BallotEntry],
        now: DateTime<Utc>,
    ) -> AppResult<Vec<BallotDecision>> {
        ensure_open(&self.election, now)?;

        if entries.is_empty() {
            return Err(AppError::MalformedBallot(
                "ballot contains no decisions".to_string(),
            ));
        }

        if entries.len() > self.portfolios.len() {
            return Err(AppError::MalformedBallot(format!(
                "ballot has {} decisions but the election has {} portfolios",
                entries.len(),
                self.portfolios.len()
            )));
        }

        let election_id = self.election.id;
        let portfolio_ids: HashSet<i32> = self.portfolios.iter().map(|p| p.id).collect();
        let candidates: HashMap<i32, &candidate::Model> =
            self.candidates.iter().map(|c| (c.id, c)).collect();

        let mut seen = HashSet::with_capacity(entries.len());
        let mut decisions = Vec::with_capacity(entries.len());

        for entry in entries {
            if !portfolio_ids.contains(&entry.portfolio_id) {
                return Err(AppError::UnknownPortfolio(entry.portfolio_id));
            }
            if !seen.insert(entry.portfolio_id) {
                return Err(AppError::MalformedBallot(format!(
                    "portfolio {} appears more than once",
                    entry.portfolio_id
                )));
            }

            let action_type = entry.action_type.unwrap_or_default();
            let candidate_id = match action_type {
                ActionType::Skip => None,
                ActionType::Vote => {
                    let Some(candidate_id) = entry.candidate_id else {
                        return Err(AppError::InvalidCandidateBinding(format!(
                            "a candidate is required to vote on portfolio {}",
                            entry.portfolio_id
                        )));
                    };
                    let candidate = candidates.get(&candidate_id).ok_or_else(|| {
                        AppError::InvalidCandidateBinding(format!(
                            "candidate {candidate_id} not found in this election"
                        ))
                    })?;
                    if !candidate.is_bound_to(entry.portfolio_id, election_id) {
                        return Err(AppError::InvalidCandidateBinding(format!(
                            "candidate {candidate_id} does not belong to portfolio {} in this election",
                            entry.portfolio_id
                        )));
                    }
                    Some(candidate_id)
                }
            };

            decisions.push(BallotDecision {
                portfolio_id: entry.portfolio_id,
                candidate_id,
                action_type,
            });
        }

        Ok(decisions)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn directory(status: ElectionStatus) -> BallotDirectory {
        let now = Utc::now();
        let election = election::Model {
            id: 1,
            name: "SRC 2025".to_string(),
            description: None,
            status,
            start_date: Some((now - Duration::hours(1)).into()),
            end_date: Some((now + Duration::hours(1)).into()),
            created_at: now.into(),
            updated_at: None,
        };
        let portfolio = |id: i32| portfolio::Model {
            id,
            name: format!("P{id}"),
            description: None,
            election_id: 1,
            created_at: now.into(),
        };
        let candidate = |id: i32, portfolio_id: i32| candidate::Model {
            id,
            name: format!("C{id}"),
            party: None,
            party_symbol: None,
            profile_picture: None,
            portfolio_id,
            election_id: 1,
            created_at: now.into(),
        };

        BallotDirectory {
            election,
            portfolios: vec![portfolio(1), portfolio(2)],
            candidates: vec![candidate(1, 1), candidate(2, 1), candidate(9, 2)],
        }
    }

    const fn entry(portfolio_id: i32, candidate_id: Option<i32>, action: Option<ActionType>) -> BallotEntry {
        BallotEntry {
            portfolio_id,
            candidate_id,
            action_type: action,
        }
    }

    #[test]
    fn test_vote_is_normalised() {
        let dir = directory(ElectionStatus::InProgress);
        let decisions = dir
            .validate(&[entry(1, Some(1), Some(ActionType::Vote))], Utc::now())
            .unwrap();

        assert_eq!(
            decisions,
            vec![BallotDecision {
                portfolio_id: 1,
                candidate_id: Some(1),
                action_type: ActionType::Vote,
            }]
        );
    }

    #[test]
    fn test_action_type_defaults_to_vote() {
        let dir = directory(ElectionStatus::InProgress);
        let decisions = dir.validate(&[entry(1, Some(2), None)], Utc::now()).unwrap();
        assert_eq!(decisions[0].action_type, ActionType::Vote);
        assert_eq!(decisions[0].candidate_id, Some(2));
    }

    #[test]
    fn test_skip_drops_candidate() {
        let dir = directory(ElectionStatus::InProgress);
        // Even a candidate from another portfolio is ignored on a skip
        let decisions = dir
            .validate(&[entry(1, Some(9), Some(ActionType::Skip))], Utc::now())
            .unwrap();
        assert_eq!(decisions[0].candidate_id, None);
        assert_eq!(decisions[0].action_type, ActionType::Skip);
    }

    #[test]
    fn test_ended_election_is_not_active() {
        let dir = directory(ElectionStatus::Ended);
        let result = dir.validate(&[entry(1, Some(1), None)], Utc::now());
        assert!(matches!(result, Err(AppError::ElectionNotActive(s)) if s == "ENDED"));
    }

    #[test]
    fn test_window_end_is_exclusive() {
        let dir = directory(ElectionStatus::InProgress);
        let end = dir.election.end_date.unwrap().with_timezone(&Utc);

        assert!(dir.validate(&[entry(1, Some(1), None)], end - Duration::seconds(1)).is_ok());
        assert!(matches!(
            dir.validate(&[entry(1, Some(1), None)], end),
            Err(AppError::ElectionWindowClosed)
        ));
    }

    #[test]
    fn test_window_start_is_inclusive() {
        let dir = directory(ElectionStatus::InProgress);
        let start = dir.election.start_date.unwrap().with_timezone(&Utc);

        assert!(dir.validate(&[entry(1, Some(1), None)], start).is_ok());
        assert!(matches!(
            dir.validate(&[entry(1, Some(1), None)], start - Duration::seconds(1)),
            Err(AppError::ElectionWindowClosed)
        ));
    }

    #[test]
    fn test_unknown_portfolio() {
        let dir = directory(ElectionStatus::InProgress);
        let result = dir.validate(&[entry(3, Some(1), None)], Utc::now());
        assert!(matches!(result, Err(AppError::UnknownPortfolio(3))));
    }

    #[test]
    fn test_candidate_from_other_portfolio_rejects_whole_ballot() {
        let dir = directory(ElectionStatus::InProgress);
        let result = dir.validate(
            &[entry(2, Some(9), None), entry(1, Some(9), None)],
            Utc::now(),
        );
        assert!(matches!(result, Err(AppError::InvalidCandidateBinding(_))));
    }

    #[test]
    fn test_vote_without_candidate() {
        let dir = directory(ElectionStatus::InProgress);
        let result = dir.validate(&[entry(1, None, Some(ActionType::Vote))], Utc::now());
        assert!(matches!(result, Err(AppError::InvalidCandidateBinding(_))));
    }

    #[test]
    fn test_unresolvable_candidate() {
        let dir = directory(ElectionStatus::InProgress);
        let result = dir.validate(&[entry(1, Some(404), None)], Utc::now());
        assert!(matches!(result, Err(AppError::InvalidCandidateBinding(msg)) if msg.contains("404")));
    }

    #[test]
    fn test_duplicate_portfolio_is_malformed() {
        let dir = directory(ElectionStatus::InProgress);
        let result = dir.validate(
            &[entry(1, Some(1), None), entry(1, None, Some(ActionType::Skip))],
            Utc::now(),
        );
        assert!(matches!(result, Err(AppError::MalformedBallot(_))));
    }

    #[test]
    fn test_empty_ballot() {
        let dir = directory(ElectionStatus::InProgress);
        assert!(matches!(
            dir.validate(&[], Utc::now()),
            Err(AppError::MalformedBallot(_))
        ));

        let input = SubmitBallotInput {
            election_id: 1,
            votes: vec![],
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn test_large_ballot_is_bounded_by_portfolios() {
        let mut dir = directory(ElectionStatus::InProgress);
        let template = dir.portfolios[0].clone();
        dir.portfolios = (1..=150)
            .map(|id| portfolio::Model { id, ..template.clone() })
            .collect();

        let skips: Vec<BallotEntry> = (1..=150)
            .map(|id| entry(id, None, Some(ActionType::Skip)))
            .collect();
        let input = SubmitBallotInput {
            election_id: 1,
            votes: skips.clone(),
        };
        assert!(input.validate().is_ok());
        assert_eq!(dir.validate(&skips, Utc::now()).unwrap().len(), 150);

        let mut too_many = skips;
        too_many.push(entry(1, None, Some(ActionType::Skip)));
        assert!(matches!(
            dir.validate(&too_many, Utc::now()),
            Err(AppError::MalformedBallot(msg)) if msg.contains("151")
        ));
    }

    #[test]
    fn test_inverted_window_never_opens() {
        let mut dir = directory(ElectionStatus::InProgress);
        let now = Utc::now();
        dir.election.start_date = Some((now - Duration::hours(1)).into());
        dir.election.end_date = Some((now - Duration::hours(2)).into());

        assert!(matches!(
            ensure_open(&dir.election, now - Duration::hours(1)),
            Err(AppError::ElectionWindowClosed)
        ));
        assert!(matches!(
            ensure_open(&dir.election, now),
            Err(AppError::ElectionWindowClosed)
        ));
    }

    #[test]
    fn test_entry_deserialises_without_action_type() {
        let entry: BallotEntry =
            serde_json::from_str(r#"{"portfolioId":1,"candidateId":2}"#).unwrap();
        assert_eq!(entry.action_type, None);

        let entry: BallotEntry =
            serde_json::from_str(r#"{"portfolioId":1,"candidateId":null,"actionType":"SKIP"}"#)
                .unwrap();
        assert_eq!(entry.action_type, Some(ActionType::Skip));
    }
}
