//! Dashboard summaries.
//!
//! Administrators get live standings for every election. Voters get turnout
//! for the elections they are registered in, with standings only once an
//! election has ended.

use std::collections::HashMap;

use ballotbox_common::{AppError, AppResult};
use ballotbox_db::{
    entities::{election, election::ElectionStatus, voter},
    repositories::{
        CandidateRepository, ElectionRepository, PortfolioRepository, VoterElectionRepository,
        VoterRepository,
    },
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{
    ballot_validator::BallotDirectory,
    tally::{ElectionResults, TallyService},
};
use crate::Principal;

/// Every election with its standings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminDashboard {
    /// Newest first.
    pub elections: Vec<ElectionResults>,
    pub last_updated: DateTime<Utc>,
}

/// The voter a dashboard belongs to.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardVoter {
    pub id: i32,
    pub name: String,
    pub voter_id: Option<String>,
}

/// One election on a voter's dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterDashboardElection {
    /// `portfolios` is empty until the election has ended.
    #[serde(flatten)]
    pub results: ElectionResults,
    pub has_voted: bool,
}

/// A voter's elections.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoterDashboard {
    pub voter: DashboardVoter,
    pub elections: Vec<VoterDashboardElection>,
    pub last_updated: DateTime<Utc>,
}

/// Dashboard service.
#[derive(Clone)]
pub struct DashboardService {
    election_repo: ElectionRepository,
    portfolio_repo: PortfolioRepository,
    candidate_repo: CandidateRepository,
    voter_repo: VoterRepository,
    voter_election_repo: VoterElectionRepository,
    tally_service: TallyService,
}

impl DashboardService {
    /// Create a new dashboard service.
    #[must_use]
    pub const fn new(
        election_repo: ElectionRepository,
        portfolio_repo: PortfolioRepository,
        candidate_repo: CandidateRepository,
        voter_repo: VoterRepository,
        voter_election_repo: VoterElectionRepository,
        tally_service: TallyService,
    ) -> Self {
        Self {
            election_repo,
            portfolio_repo,
            candidate_repo,
            voter_repo,
            voter_election_repo,
            tally_service,
        }
    }

    /// Standings of every election.
    pub async fn admin(&self) -> AppResult<AdminDashboard> {
        let mut elections = Vec::new();
        for election in self.election_repo.find_all().await? {
            let directory = self.directory(election).await?;
            elections.push(self.tally_service.tally(&directory).await?);
        }

        Ok(AdminDashboard {
            elections,
            last_updated: Utc::now(),
        })
    }

    /// Elections of the voter behind `principal`.
    ///
    /// Administrators see the elections of the voter registered under their
    /// user ID.
    pub async fn voter(&self, principal: &Principal) -> AppResult<VoterDashboard> {
        let voter = self.resolve_voter(principal).await?;

        let registrations = self.voter_election_repo.find_by_voter(voter.id).await?;
        if registrations.is_empty() {
            return Err(no_elections());
        }
        let voted: HashMap<i32, bool> = registrations
            .iter()
            .map(|r| (r.election_id, r.has_voted))
            .collect();
        let ids: Vec<i32> = voted.keys().copied().collect();

        let mut elections = Vec::with_capacity(ids.len());
        for election in self.election_repo.find_by_ids(&ids).await? {
            let has_voted = voted.get(&election.id).copied().unwrap_or(false);
            let ended = election.status == ElectionStatus::Ended;
            let directory = self.directory(election).await?;

            let results = if ended {
                self.tally_service.tally(&directory).await?
            } else {
                self.tally_service.turnout(&directory).await?
            };
            elections.push(VoterDashboardElection { results, has_voted });
        }

        Ok(VoterDashboard {
            voter: DashboardVoter {
                id: voter.id,
                name: voter.name,
                voter_id: voter.voter_id,
            },
            elections,
            last_updated: Utc::now(),
        })
    }

    async fn resolve_voter(&self, principal: &Principal) -> AppResult<voter::Model> {
        match principal {
            Principal::Voter(voter) => Ok(voter.clone()),
            Principal::Admin(user) => self
                .voter_repo
                .find_by_voter_id(&user.id)
                .await?
                .ok_or_else(no_elections),
        }
    }

    async fn directory(&self, election: election::Model) -> AppResult<BallotDirectory> {
        Ok(BallotDirectory {
            portfolios: self.portfolio_repo.find_by_election(election.id).await?,
            candidates: self.candidate_repo.find_by_election(election.id).await?,
            election,
        })
    }
}

fn no_elections() -> AppError {
    AppError::NotFound("No elections found for this voter".to_string())
}
