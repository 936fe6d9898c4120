//! Tally aggregation.
//!
//! Results are always recomputed from the decision log and the voter
//! registrations; nothing is cached between calls.

use std::collections::HashMap;

use ballotbox_common::{AppError, AppResult};
use ballotbox_db::{
    entities::{candidate, election, election::ElectionStatus, portfolio, vote_action::ActionType},
    repositories::{
        CandidateRepository, DecisionCount, ElectionRepository, PortfolioRepository,
        VoteActionRepository, VoterElectionRepository,
    },
};
use chrono::{DateTime, Utc};
use sea_orm::prelude::DateTimeWithTimeZone;
use serde::Serialize;

use crate::{Principal, services::ballot_validator::BallotDirectory};

/// Tally of one candidate.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateResult {
    pub id: i32,
    pub name: String,
    pub party: Option<String>,
    pub party_symbol: Option<String>,
    pub profile_picture: Option<String>,
    pub vote_count: i64,
    /// Share of all decisions on the portfolio, skips included.
    pub percentage: f64,
}

/// Tally of one portfolio.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioResult {
    pub portfolio_id: i32,
    pub portfolio_name: String,
    pub portfolio_description: Option<String>,
    /// Votes plus skips.
    pub total_votes: i64,
    pub skip_votes: i64,
    pub skip_percentage: f64,
    /// Most votes first; equal counts by ascending candidate ID.
    pub candidates: Vec<CandidateResult>,
    pub winner: Option<CandidateResult>,
    /// The two leading candidates share a positive vote count.
    pub is_tie: bool,
}

/// Election header carried with results.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionSummary {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub status: ElectionStatus,
    pub start_date: Option<DateTimeWithTimeZone>,
    pub end_date: Option<DateTimeWithTimeZone>,
}

/// Turnout figures of an election.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TurnoutSummary {
    pub total_voters: u64,
    pub total_votes_cast: u64,
    pub turnout_percentage: f64,
    pub total_portfolios: usize,
    pub total_candidates: usize,
}

/// Full results of an election.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionResults {
    pub election_id: i32,
    pub election: ElectionSummary,
    pub summary: TurnoutSummary,
    pub portfolios: Vec<PortfolioResult>,
    pub last_updated: DateTime<Utc>,
}

/// `part / whole * 100` rounded to two decimals, `0.0` for an empty whole.
#[must_use]
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    let raw = part as f64 / whole as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}

/// Project grouped decision counts onto the directory.
#[must_use]
pub fn compute_results(
    election: &election::Model,
    portfolios: &[portfolio::Model],
    candidates: &[candidate::Model],
    counts: &[DecisionCount],
    total_voters: u64,
    total_votes_cast: u64,
    now: DateTime<Utc>,
) -> ElectionResults {
    let mut totals: HashMap<i32, u64> = HashMap::new();
    let mut skips: HashMap<i32, u64> = HashMap::new();
    let mut votes: HashMap<(i32, i32), u64> = HashMap::new();

    for count in counts {
        let n = count.decisions.max(0) as u64;
        *totals.entry(count.portfolio_id).or_default() += n;
        match (count.action_type, count.candidate_id) {
            (ActionType::Skip, _) => *skips.entry(count.portfolio_id).or_default() += n,
            (ActionType::Vote, Some(candidate_id)) => {
                *votes.entry((count.portfolio_id, candidate_id)).or_default() += n;
            }
            (ActionType::Vote, None) => {}
        }
    }

    let portfolio_results = portfolios
        .iter()
        .map(|portfolio| {
            let total = totals.get(&portfolio.id).copied().unwrap_or(0);
            let skip = skips.get(&portfolio.id).copied().unwrap_or(0);

            let mut standings: Vec<CandidateResult> = candidates
                .iter()
                .filter(|c| c.portfolio_id == portfolio.id)
                .map(|c| {
                    let count = votes.get(&(portfolio.id, c.id)).copied().unwrap_or(0);
                    CandidateResult {
                        id: c.id,
                        name: c.name.clone(),
                        party: c.party.clone(),
                        party_symbol: c.party_symbol.clone(),
                        profile_picture: c.profile_picture.clone(),
                        vote_count: count as i64,
                        percentage: percentage(count, total),
                    }
                })
                .collect();
            standings.sort_by(|a, b| b.vote_count.cmp(&a.vote_count).then(a.id.cmp(&b.id)));

            let winner = standings.first().filter(|c| c.vote_count > 0).cloned();
            let is_tie = match standings.as_slice() {
                [first, second, ..] => first.vote_count > 0 && first.vote_count == second.vote_count,
                _ => false,
            };

            PortfolioResult {
                portfolio_id: portfolio.id,
                portfolio_name: portfolio.name.clone(),
                portfolio_description: portfolio.description.clone(),
                total_votes: total as i64,
                skip_votes: skip as i64,
                skip_percentage: percentage(skip, total),
                candidates: standings,
                winner,
                is_tie,
            }
        })
        .collect();

    // Counts are read separately, so a ballot landing between them could
    // push cast above registered.
    let turnout = percentage(total_votes_cast, total_voters).min(100.0);

    ElectionResults {
        election_id: election.id,
        election: ElectionSummary {
            id: election.id,
            name: election.name.clone(),
            description: election.description.clone(),
            status: election.status,
            start_date: election.start_date,
            end_date: election.end_date,
        },
        summary: TurnoutSummary {
            total_voters,
            total_votes_cast,
            turnout_percentage: turnout,
            total_portfolios: portfolios.len(),
            total_candidates: candidates.len(),
        },
        portfolios: portfolio_results,
        last_updated: now,
    }
}

/// Tally service for reading election results.
#[derive(Clone)]
pub struct TallyService {
    election_repo: ElectionRepository,
    portfolio_repo: PortfolioRepository,
    candidate_repo: CandidateRepository,
    vote_action_repo: VoteActionRepository,
    voter_election_repo: VoterElectionRepository,
}

impl TallyService {
    /// Create a new tally service.
    #[must_use]
    pub const fn new(
        election_repo: ElectionRepository,
        portfolio_repo: PortfolioRepository,
        candidate_repo: CandidateRepository,
        vote_action_repo: VoteActionRepository,
        voter_election_repo: VoterElectionRepository,
    ) -> Self {
        Self {
            election_repo,
            portfolio_repo,
            candidate_repo,
            vote_action_repo,
            voter_election_repo,
        }
    }

    /// Check that `principal` may read the tally of an election.
    ///
    /// Administrators may read results at any time; voters only once the
    /// election has ended. Anonymous callers never.
    pub async fn authorize_read(
        &self,
        principal: Option<&Principal>,
        election_id: i32,
    ) -> AppResult<election::Model> {
        let Some(principal) = principal else {
            return Err(AppError::Unauthorized);
        };
        let election = self.election_repo.get_by_id(election_id).await?;

        if !principal.is_admin() && election.status != ElectionStatus::Ended {
            return Err(AppError::Forbidden(
                "Results are only available after the election has ended.".to_string(),
            ));
        }
        Ok(election)
    }

    /// Results of an election as seen by `principal`.
    pub async fn results_for(
        &self,
        principal: &Principal,
        election_id: i32,
    ) -> AppResult<ElectionResults> {
        let election = self.authorize_read(Some(principal), election_id).await?;

        let directory = BallotDirectory {
            portfolios: self.portfolio_repo.find_by_election(election_id).await?,
            candidates: self.candidate_repo.find_by_election(election_id).await?,
            election,
        };
        self.tally(&directory).await
    }

    /// Recompute results for a directory snapshot from durable storage.
    pub async fn tally(&self, directory: &BallotDirectory) -> AppResult<ElectionResults> {
        let counts = self
            .vote_action_repo
            .decision_counts(directory.election.id)
            .await?;
        self.compute(directory, &counts).await
    }

    /// Turnout of an election without per-portfolio standings.
    pub async fn turnout(&self, directory: &BallotDirectory) -> AppResult<ElectionResults> {
        let mut results = self.compute(directory, &[]).await?;
        results.portfolios.clear();
        Ok(results)
    }

    async fn compute(
        &self,
        directory: &BallotDirectory,
        counts: &[DecisionCount],
    ) -> AppResult<ElectionResults> {
        let election_id = directory.election.id;
        let total_voters = self
            .voter_election_repo
            .count_registered(election_id)
            .await?;
        let total_votes_cast = self.voter_election_repo.count_voted(election_id).await?;

        Ok(compute_results(
            &directory.election,
            &directory.portfolios,
            &directory.candidates,
            counts,
            total_voters,
            total_votes_cast,
            Utc::now(),
        ))
    }
}
