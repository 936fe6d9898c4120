//! Election directory service.

use std::collections::HashMap;

use ballotbox_common::{AppError, AppResult};
use ballotbox_db::{
    entities::{candidate, election, portfolio, voter_election},
    repositories::{
        CandidateRepository, ElectionRepository, PortfolioRepository, VoterElectionRepository,
        VoterRepository,
    },
};
use serde::Serialize;
use tracing::info;

use crate::Principal;

/// An election as listed to a caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionListing {
    #[serde(flatten)]
    pub election: election::Model,
    /// Present for voters only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub has_voted: Option<bool>,
}

/// A portfolio with its candidates.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotSheetPortfolio {
    #[serde(flatten)]
    pub portfolio: portfolio::Model,
    pub candidates: Vec<candidate::Model>,
}

/// What a voter sees when filling in a ballot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotSheet {
    pub election: election::Model,
    pub portfolios: Vec<BallotSheetPortfolio>,
}

/// Result of registering a voter for an election.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    #[serde(flatten)]
    pub registration: voter_election::Model,
    /// `false` when the voter was already registered.
    pub created: bool,
}

/// Read side of the election directory, plus voter registration.
#[derive(Clone)]
pub struct ElectionService {
    election_repo: ElectionRepository,
    portfolio_repo: PortfolioRepository,
    candidate_repo: CandidateRepository,
    voter_repo: VoterRepository,
    voter_election_repo: VoterElectionRepository,
}

impl ElectionService {
    /// Create a new election service.
    #[must_use]
    pub const fn new(
        election_repo: ElectionRepository,
        portfolio_repo: PortfolioRepository,
        candidate_repo: CandidateRepository,
        voter_repo: VoterRepository,
        voter_election_repo: VoterElectionRepository,
    ) -> Self {
        Self {
            election_repo,
            portfolio_repo,
            candidate_repo,
            voter_repo,
            voter_election_repo,
        }
    }

    /// Elections visible to `principal`.
    ///
    /// Administrators see every election. Voters see the elections they are
    /// registered for, each with their `has_voted` flag.
    pub async fn list_for(&self, principal: &Principal) -> AppResult<Vec<ElectionListing>> {
        match principal {
            Principal::Admin(_) => Ok(self
                .election_repo
                .find_all()
                .await?
                .into_iter()
                .map(|election| ElectionListing {
                    election,
                    has_voted: None,
                })
                .collect()),
            Principal::Voter(voter) => {
                let registrations = self.voter_election_repo.find_by_voter(voter.id).await?;
                let voted: HashMap<i32, bool> = registrations
                    .iter()
                    .map(|r| (r.election_id, r.has_voted))
                    .collect();
                let ids: Vec<i32> = voted.keys().copied().collect();

                Ok(self
                    .election_repo
                    .find_by_ids(&ids)
                    .await?
                    .into_iter()
                    .map(|election| ElectionListing {
                        has_voted: Some(voted.get(&election.id).copied().unwrap_or(false)),
                        election,
                    })
                    .collect())
            }
        }
    }

    /// Portfolios and candidates of an election.
    pub async fn ballot_sheet(&self, election_id: i32) -> AppResult<BallotSheet> {
        let election = self.election_repo.get_by_id(election_id).await?;
        let portfolios = self.portfolio_repo.find_by_election(election_id).await?;
        let candidates = self.candidate_repo.find_by_election(election_id).await?;

        let mut by_portfolio: HashMap<i32, Vec<candidate::Model>> = HashMap::new();
        for candidate in candidates {
            by_portfolio
                .entry(candidate.portfolio_id)
                .or_default()
                .push(candidate);
        }

        let portfolios = portfolios
            .into_iter()
            .map(|portfolio| BallotSheetPortfolio {
                candidates: by_portfolio.remove(&portfolio.id).unwrap_or_default(),
                portfolio,
            })
            .collect();

        Ok(BallotSheet {
            election,
            portfolios,
        })
    }

    /// Register a voter for an election.
    ///
    /// Idempotent: an existing registration, voted or not, is returned as is.
    pub async fn register_voter(&self, election_id: i32, voter_id: i32) -> AppResult<Registration> {
        self.election_repo.get_by_id(election_id).await?;
        self.voter_repo.get_by_id(voter_id).await?;

        let created = self.voter_election_repo.register(voter_id, election_id).await?;
        let registration = self
            .voter_election_repo
            .find(voter_id, election_id)
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "registration of voter {voter_id} for election {election_id} vanished"
                ))
            })?;

        if created {
            info!(election_id, voter_id, "Voter registered for election");
        }

        Ok(Registration {
            registration,
            created,
        })
    }
}
