//! Audit log of ballot decisions.
//!
//! Two reads over the decision log: a paged per-election log for
//! administrators, and the per-voter trail with aggregate counts reserved for
//! super administrators.

use std::collections::{BTreeMap, HashMap, HashSet};

use ballotbox_common::AppResult;
use ballotbox_db::{
    entities::{
        candidate, election, election::ElectionStatus, vote_action, vote_action::ActionType,
        voter_election,
    },
    repositories::{
        CandidateRepository, ElectionRepository, PortfolioRepository, VoteActionRepository,
        VoterElectionRepository, VoterRepository,
    },
};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::Serialize;

/// Default number of audit entries per page.
pub const DEFAULT_AUDIT_LIMIT: u64 = 100;

/// Largest page a caller may ask for.
pub const MAX_AUDIT_LIMIT: u64 = 500;

/// One recorded decision with display names resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: i32,
    pub election_id: i32,
    pub voter_id: i32,
    pub voter_name: Option<String>,
    pub portfolio_id: i32,
    pub portfolio_name: Option<String>,
    pub candidate_id: Option<i32>,
    pub candidate_name: Option<String>,
    pub action_type: ActionType,
    pub created_at: DateTimeWithTimeZone,
}

/// An election a voter is registered for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailElection {
    pub election_id: i32,
    pub election_name: String,
    pub status: ElectionStatus,
    pub start_date: Option<DateTimeWithTimeZone>,
    pub end_date: Option<DateTimeWithTimeZone>,
    pub has_voted: bool,
}

/// A decision in a voter's trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailDecision {
    pub election_id: i32,
    pub election_name: Option<String>,
    pub portfolio_id: i32,
    pub portfolio_name: Option<String>,
    pub candidate_id: Option<i32>,
    pub candidate_name: Option<String>,
    pub candidate_party: Option<String>,
    pub candidate_party_symbol: Option<String>,
    pub action_type: ActionType,
    pub timestamp: DateTimeWithTimeZone,
}

/// Everything recorded about one voter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterTrail {
    pub voter_id: i32,
    pub voter_name: String,
    /// External identifier (student number, admin user ID, ...).
    pub voter_unique_id: Option<String>,
    pub phone_number: Option<String>,
    pub elections: Vec<TrailElection>,
    /// Oldest first.
    pub votes: Vec<TrailDecision>,
}

/// Decisions counted under one election or portfolio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionTally {
    pub id: i32,
    pub name: String,
    pub count: u64,
}

/// Aggregates over a trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailStats {
    pub total_voters: usize,
    /// Decisions, skips included.
    pub total_votes: usize,
    /// Ascending election ID.
    pub votes_by_election: Vec<DecisionTally>,
    /// Ascending portfolio ID.
    pub votes_by_portfolio: Vec<DecisionTally>,
}

/// Per-voter audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditTrail {
    pub audit_trail: Vec<VoterTrail>,
    pub stats: TrailStats,
}

/// Count the decisions of a trail by election and by portfolio.
#[must_use]
pub fn trail_stats(trail: &[VoterTrail]) -> TrailStats {
    let mut by_election: BTreeMap<i32, DecisionTally> = BTreeMap::new();
    let mut by_portfolio: BTreeMap<i32, DecisionTally> = BTreeMap::new();

    for decision in trail.iter().flat_map(|voter| &voter.votes) {
        by_election
            .entry(decision.election_id)
            .or_insert_with(|| DecisionTally {
                id: decision.election_id,
                name: decision.election_name.clone().unwrap_or_default(),
                count: 0,
            })
            .count += 1;
        by_portfolio
            .entry(decision.portfolio_id)
            .or_insert_with(|| DecisionTally {
                id: decision.portfolio_id,
                name: decision.portfolio_name.clone().unwrap_or_default(),
                count: 0,
            })
            .count += 1;
    }

    TrailStats {
        total_voters: trail.len(),
        total_votes: trail.iter().map(|voter| voter.votes.len()).sum(),
        votes_by_election: by_election.into_values().collect(),
        votes_by_portfolio: by_portfolio.into_values().collect(),
    }
}

/// Audit log service.
#[derive(Clone)]
pub struct AuditService {
    election_repo: ElectionRepository,
    vote_action_repo: VoteActionRepository,
    voter_repo: VoterRepository,
    voter_election_repo: VoterElectionRepository,
    portfolio_repo: PortfolioRepository,
    candidate_repo: CandidateRepository,
}

impl AuditService {
    /// Create a new audit service.
    #[must_use]
    pub const fn new(
        election_repo: ElectionRepository,
        vote_action_repo: VoteActionRepository,
        voter_repo: VoterRepository,
        voter_election_repo: VoterElectionRepository,
        portfolio_repo: PortfolioRepository,
        candidate_repo: CandidateRepository,
    ) -> Self {
        Self {
            election_repo,
            vote_action_repo,
            voter_repo,
            voter_election_repo,
            portfolio_repo,
            candidate_repo,
        }
    }

    /// Every voter with their registrations and decisions.
    ///
    /// With `election_id`, registrations and decisions are limited to that
    /// election; voters without any are still listed.
    pub async fn trail(&self, election_id: Option<i32>) -> AppResult<AuditTrail> {
        let voters = self.voter_repo.find_all().await?;
        let registrations = self.voter_election_repo.find_all(election_id).await?;
        let actions = self.vote_action_repo.find_all(election_id).await?;

        let election_ids = unique(
            registrations
                .iter()
                .map(|r| r.election_id)
                .chain(actions.iter().map(|a| a.election_id)),
        );
        let portfolio_ids = unique(actions.iter().map(|a| a.portfolio_id));
        let candidate_ids = unique(actions.iter().filter_map(|a| a.candidate_id));

        let elections: HashMap<i32, election::Model> = self
            .election_repo
            .find_by_ids(&election_ids)
            .await?
            .into_iter()
            .map(|e| (e.id, e))
            .collect();
        let portfolios: HashMap<i32, String> = self
            .portfolio_repo
            .find_by_ids(&portfolio_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();
        let candidates: HashMap<i32, candidate::Model> = self
            .candidate_repo
            .find_by_ids(&candidate_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        let mut registrations_by_voter: HashMap<i32, Vec<voter_election::Model>> = HashMap::new();
        for registration in registrations {
            registrations_by_voter
                .entry(registration.voter_id)
                .or_default()
                .push(registration);
        }
        let mut actions_by_voter: HashMap<i32, Vec<vote_action::Model>> = HashMap::new();
        for action in actions {
            actions_by_voter.entry(action.voter_id).or_default().push(action);
        }

        let audit_trail: Vec<VoterTrail> = voters
            .into_iter()
            .map(|voter| VoterTrail {
                elections: registrations_by_voter
                    .remove(&voter.id)
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|r| {
                        let election = elections.get(&r.election_id)?;
                        Some(TrailElection {
                            election_id: election.id,
                            election_name: election.name.clone(),
                            status: election.status,
                            start_date: election.start_date,
                            end_date: election.end_date,
                            has_voted: r.has_voted,
                        })
                    })
                    .collect(),
                votes: actions_by_voter
                    .remove(&voter.id)
                    .unwrap_or_default()
                    .into_iter()
                    .map(|a| {
                        let candidate = a.candidate_id.and_then(|id| candidates.get(&id));
                        TrailDecision {
                            election_id: a.election_id,
                            election_name: elections.get(&a.election_id).map(|e| e.name.clone()),
                            portfolio_id: a.portfolio_id,
                            portfolio_name: portfolios.get(&a.portfolio_id).cloned(),
                            candidate_id: a.candidate_id,
                            candidate_name: candidate.map(|c| c.name.clone()),
                            candidate_party: candidate.and_then(|c| c.party.clone()),
                            candidate_party_symbol: candidate.and_then(|c| c.party_symbol.clone()),
                            action_type: a.action_type,
                            timestamp: a.created_at,
                        }
                    })
                    .collect(),
                voter_id: voter.id,
                voter_name: voter.name,
                voter_unique_id: voter.voter_id,
                phone_number: voter.phone_number,
            })
            .collect();

        let stats = trail_stats(&audit_trail);
        Ok(AuditTrail { audit_trail, stats })
    }

    /// One page of the decisions recorded for an election, newest first.
    ///
    /// Pass the smallest `id` of a page as `until_id` to read the next one;
    /// an empty page means the log is exhausted.
    pub async fn logs(
        &self,
        election_id: i32,
        limit: Option<u64>,
        until_id: Option<i32>,
    ) -> AppResult<Vec<AuditLogEntry>> {
        self.election_repo.get_by_id(election_id).await?;

        let limit = limit.unwrap_or(DEFAULT_AUDIT_LIMIT).clamp(1, MAX_AUDIT_LIMIT);
        let actions = self
            .vote_action_repo
            .find_by_election(election_id, limit, until_id)
            .await?;

        let voter_ids: Vec<i32> = unique(actions.iter().map(|a| a.voter_id));
        let portfolio_ids: Vec<i32> = unique(actions.iter().map(|a| a.portfolio_id));
        let candidate_ids: Vec<i32> = unique(actions.iter().filter_map(|a| a.candidate_id));

        let voters: HashMap<i32, String> = self
            .voter_repo
            .find_by_ids(&voter_ids)
            .await?
            .into_iter()
            .map(|v| (v.id, v.name))
            .collect();
        let portfolios: HashMap<i32, String> = self
            .portfolio_repo
            .find_by_ids(&portfolio_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p.name))
            .collect();
        let candidates: HashMap<i32, String> = self
            .candidate_repo
            .find_by_ids(&candidate_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();

        Ok(actions
            .into_iter()
            .map(|a| AuditLogEntry {
                id: a.id,
                election_id: a.election_id,
                voter_id: a.voter_id,
                voter_name: voters.get(&a.voter_id).cloned(),
                portfolio_id: a.portfolio_id,
                portfolio_name: portfolios.get(&a.portfolio_id).cloned(),
                candidate_id: a.candidate_id,
                candidate_name: a.candidate_id.and_then(|id| candidates.get(&id).cloned()),
                action_type: a.action_type,
                created_at: a.created_at,
            })
            .collect())
    }
}

fn unique(ids: impl Iterator<Item = i32>) -> Vec<i32> {
    ids.collect::<HashSet<_>>().into_iter().collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use ballotbox_common::AppError;
    use ballotbox_db::entities::{
        candidate, election, election::ElectionStatus, portfolio, vote_action, voter, voter_election,
    };
    use chrono::Utc;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
    use std::sync::Arc;

    fn db_with<M: sea_orm::IntoMockRow>(rows: Vec<M>) -> Arc<DatabaseConnection> {
        Arc::new(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([rows])
                .into_connection(),
        )
    }

    fn action(id: i32, candidate_id: Option<i32>, action_type: ActionType) -> vote_action::Model {
        vote_action::Model {
            id,
            voter_id: 5,
            election_id: 1,
            portfolio_id: 10,
            candidate_id,
            action_type,
            created_at: Utc::now().into(),
        }
    }

    #[tokio::test]
    async fn test_logs_resolve_names() {
        let election = election::Model {
            id: 1,
            name: "SRC".to_string(),
            description: None,
            status: ElectionStatus::Ended,
            start_date: None,
            end_date: None,
            created_at: Utc::now().into(),
            updated_at: None,
        };
        let voter = voter::Model {
            id: 5,
            voter_id: None,
            phone_number: None,
            name: "Ama".to_string(),
            token: None,
            created_at: Utc::now().into(),
        };
        let portfolio = portfolio::Model {
            id: 10,
            name: "President".to_string(),
            description: None,
            election_id: 1,
            created_at: Utc::now().into(),
        };
        let candidate = candidate::Model {
            id: 100,
            name: "Kofi".to_string(),
            party: None,
            party_symbol: None,
            profile_picture: None,
            portfolio_id: 10,
            election_id: 1,
            created_at: Utc::now().into(),
        };

        let service = AuditService::new(
            ElectionRepository::new(db_with(vec![election])),
            VoteActionRepository::new(db_with(vec![
                action(2, None, ActionType::Skip),
                action(1, Some(100), ActionType::Vote),
            ])),
            VoterRepository::new(db_with(vec![voter])),
            VoterElectionRepository::new(db_with(Vec::<voter_election::Model>::new())),
            PortfolioRepository::new(db_with(vec![portfolio])),
            CandidateRepository::new(db_with(vec![candidate])),
        );

        let logs = service.logs(1, None, None).await.unwrap();

        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].id, 2);
        assert_eq!(logs[0].candidate_name, None);
        assert_eq!(logs[1].voter_name.as_deref(), Some("Ama"));
        assert_eq!(logs[1].portfolio_name.as_deref(), Some("President"));
        assert_eq!(logs[1].candidate_name.as_deref(), Some("Kofi"));
    }

    #[tokio::test]
    async fn test_logs_page_backwards_with_clamped_limit() {
        let election = election::Model {
            id: 1,
            name: "SRC".to_string(),
            description: None,
            status: ElectionStatus::Ended,
            start_date: None,
            end_date: None,
            created_at: Utc::now().into(),
            updated_at: None,
        };
        let action_db = db_with(Vec::<vote_action::Model>::new());
        let service = AuditService::new(
            ElectionRepository::new(db_with(vec![election])),
            VoteActionRepository::new(action_db.clone()),
            VoterRepository::new(db_with(Vec::<voter::Model>::new())),
            VoterElectionRepository::new(db_with(Vec::<voter_election::Model>::new())),
            PortfolioRepository::new(db_with(Vec::<portfolio::Model>::new())),
            CandidateRepository::new(db_with(Vec::<candidate::Model>::new())),
        );

        let page = service.logs(1, Some(10_000), Some(42)).await.unwrap();
        assert!(page.is_empty());
        drop(service);

        let log = Arc::try_unwrap(action_db).unwrap().into_transaction_log();
        let statement = &log[0].statements()[0];
        let values = format!("{:?}", statement.values);
        assert!(statement.sql.contains(r#""vote_action"."id" <"#));
        assert!(values.contains("42"));
        assert!(values.contains(&MAX_AUDIT_LIMIT.to_string()));
    }

    #[tokio::test]
    async fn test_logs_for_missing_election() {
        let service = AuditService::new(
            ElectionRepository::new(db_with(Vec::<election::Model>::new())),
            VoteActionRepository::new(db_with(Vec::<vote_action::Model>::new())),
            VoterRepository::new(db_with(Vec::<voter::Model>::new())),
            VoterElectionRepository::new(db_with(Vec::<voter_election::Model>::new())),
            PortfolioRepository::new(db_with(Vec::<portfolio::Model>::new())),
            CandidateRepository::new(db_with(Vec::<candidate::Model>::new())),
        );

        let result = service.logs(3, Some(10), None).await;
        assert!(matches!(result, Err(AppError::ElectionNotFound(3))));
    }

    fn decision(
        election: (i32, &str),
        portfolio: (i32, &str),
        action_type: ActionType,
    ) -> TrailDecision {
        TrailDecision {
            election_id: election.0,
            election_name: Some(election.1.to_string()),
            portfolio_id: portfolio.0,
            portfolio_name: Some(portfolio.1.to_string()),
            candidate_id: None,
            candidate_name: None,
            candidate_party: None,
            candidate_party_symbol: None,
            action_type,
            timestamp: Utc::now().into(),
        }
    }

    fn trail_of(voter_id: i32, votes: Vec<TrailDecision>) -> VoterTrail {
        VoterTrail {
            voter_id,
            voter_name: format!("Voter {voter_id}"),
            voter_unique_id: None,
            phone_number: None,
            elections: vec![],
            votes,
        }
    }

    #[test]
    fn test_trail_stats_group_by_election_and_portfolio() {
        let trail = vec![
            trail_of(
                1,
                vec![
                    decision((2, "Hall"), (20, "Treasurer"), ActionType::Vote),
                    decision((1, "SRC"), (10, "President"), ActionType::Skip),
                ],
            ),
            trail_of(2, vec![decision((1, "SRC"), (10, "President"), ActionType::Vote)]),
            trail_of(3, vec![]),
        ];

        let stats = trail_stats(&trail);

        assert_eq!(stats.total_voters, 3);
        assert_eq!(stats.total_votes, 3);
        assert_eq!(
            stats.votes_by_election,
            vec![
                DecisionTally { id: 1, name: "SRC".to_string(), count: 2 },
                DecisionTally { id: 2, name: "Hall".to_string(), count: 1 },
            ]
        );
        assert_eq!(stats.votes_by_portfolio[0].name, "President");
        assert_eq!(stats.votes_by_portfolio[0].count, 2);
        assert_eq!(stats.votes_by_portfolio[1].id, 20);
    }

    #[tokio::test]
    async fn test_trail_joins_registrations_and_decisions() {
        let election = election::Model {
            id: 1,
            name: "SRC".to_string(),
            description: None,
            status: ElectionStatus::InProgress,
            start_date: None,
            end_date: None,
            created_at: Utc::now().into(),
            updated_at: None,
        };
        let voters = vec![
            voter::Model {
                id: 5,
                voter_id: Some("S5".to_string()),
                phone_number: Some("+233200000005".to_string()),
                name: "Ama".to_string(),
                token: None,
                created_at: Utc::now().into(),
            },
            voter::Model {
                id: 6,
                voter_id: None,
                phone_number: None,
                name: "Kwame".to_string(),
                token: None,
                created_at: Utc::now().into(),
            },
        ];
        let registration = voter_election::Model {
            id: 1,
            voter_id: 5,
            election_id: 1,
            has_voted: true,
            created_at: Utc::now().into(),
            updated_at: None,
        };
        let portfolio = portfolio::Model {
            id: 10,
            name: "President".to_string(),
            description: None,
            election_id: 1,
            created_at: Utc::now().into(),
        };
        let candidate = candidate::Model {
            id: 100,
            name: "Kofi".to_string(),
            party: Some("Unity".to_string()),
            party_symbol: Some("dove.png".to_string()),
            profile_picture: None,
            portfolio_id: 10,
            election_id: 1,
            created_at: Utc::now().into(),
        };

        let service = AuditService::new(
            ElectionRepository::new(db_with(vec![election])),
            VoteActionRepository::new(db_with(vec![
                action(1, Some(100), ActionType::Vote),
                action(2, None, ActionType::Skip),
            ])),
            VoterRepository::new(db_with(voters)),
            VoterElectionRepository::new(db_with(vec![registration])),
            PortfolioRepository::new(db_with(vec![portfolio])),
            CandidateRepository::new(db_with(vec![candidate])),
        );

        let trail = service.trail(Some(1)).await.unwrap();

        assert_eq!(trail.audit_trail.len(), 2);
        let ama = &trail.audit_trail[0];
        assert_eq!(ama.voter_unique_id.as_deref(), Some("S5"));
        assert_eq!(ama.elections.len(), 1);
        assert!(ama.elections[0].has_voted);
        assert_eq!(ama.votes.len(), 2);
        assert_eq!(ama.votes[0].candidate_party.as_deref(), Some("Unity"));
        assert_eq!(ama.votes[0].election_name.as_deref(), Some("SRC"));
        assert_eq!(ama.votes[1].candidate_name, None);

        let kwame = &trail.audit_trail[1];
        assert!(kwame.elections.is_empty());
        assert!(kwame.votes.is_empty());

        assert_eq!(trail.stats.total_voters, 2);
        assert_eq!(trail.stats.total_votes, 2);
        assert_eq!(trail.stats.votes_by_portfolio[0].count, 2);

        let json = serde_json::to_value(&trail).unwrap();
        assert_eq!(json["auditTrail"][0]["voterUniqueId"], "S5");
        assert_eq!(json["stats"]["votesByElection"][0]["count"], 2);
    }
}
