//! Ballot service.

use ballotbox_common::{AppError, AppResult};
use ballotbox_db::{
    entities::voter,
    repositories::{
        BallotRepository, CandidateRepository, ElectionRepository, PortfolioRepository,
        VoterRepository,
    },
};
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};
use validator::Validate;

use super::{
    ballot_validator::{BallotDirectory, SubmitBallotInput, ensure_open},
    results_publisher::ResultsPublisherService,
    tally::{ElectionResults, PortfolioResult, TallyService},
};
use crate::Principal;

/// Receipt for an accepted ballot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BallotReceipt {
    pub message: &'static str,
    pub election_id: i32,
    /// External identifier of the voter, if they have one.
    pub voter_id: Option<String>,
    /// Countable votes written; skips are not included.
    pub votes_recorded: usize,
    /// Fresh tallies, absent if recomputation failed after commit.
    pub portfolio_results: Option<Vec<PortfolioResult>>,
}

/// Ballot service: validation, the guarded write, and post-commit fan-out.
#[derive(Clone)]
pub struct BallotService {
    election_repo: ElectionRepository,
    portfolio_repo: PortfolioRepository,
    candidate_repo: CandidateRepository,
    voter_repo: VoterRepository,
    ballot_repo: BallotRepository,
    tally_service: TallyService,
    publisher: ResultsPublisherService,
}

impl BallotService {
    /// Create a new ballot service.
    #[must_use]
    pub const fn new(
        election_repo: ElectionRepository,
        portfolio_repo: PortfolioRepository,
        candidate_repo: CandidateRepository,
        voter_repo: VoterRepository,
        ballot_repo: BallotRepository,
        tally_service: TallyService,
        publisher: ResultsPublisherService,
    ) -> Self {
        Self {
            election_repo,
            portfolio_repo,
            candidate_repo,
            voter_repo,
            ballot_repo,
            tally_service,
            publisher,
        }
    }

    /// Submit a ballot on behalf of `principal`.
    pub async fn submit(
        &self,
        principal: &Principal,
        input: SubmitBallotInput,
    ) -> AppResult<BallotReceipt> {
        let voter = self.resolve_voter(principal).await?;
        input.validate()?;

        let now = Utc::now();
        let election = self.election_repo.get_by_id(input.election_id).await?;
        ensure_open(&election, now)?;

        let directory = BallotDirectory {
            portfolios: self.portfolio_repo.find_by_election(election.id).await?,
            candidates: self.candidate_repo.find_by_election(election.id).await?,
            election,
        };
        let decisions = directory.validate(&input.votes, now)?;

        let election_id = directory.election.id;
        let recorded = self
            .ballot_repo
            .record(voter.id, election_id, &decisions)
            .await?;

        info!(
            election_id,
            voter_id = voter.id,
            actions = recorded.actions_recorded,
            votes = recorded.votes_recorded,
            "Ballot recorded"
        );

        // The ballot is committed; nothing below may fail the request.
        let results = match self.tally_service.tally(&directory).await {
            Ok(results) => {
                self.broadcast(&results).await;
                Some(results)
            }
            Err(e) => {
                error!(error = %e, election_id, "Tally failed after ballot commit");
                None
            }
        };

        Ok(BallotReceipt {
            message: "Votes recorded successfully",
            election_id,
            voter_id: voter.voter_id,
            votes_recorded: recorded.votes_recorded,
            portfolio_results: results.map(|r| r.portfolios),
        })
    }

    /// The voter record that casts the ballot.
    ///
    /// Administrators vote through the voter registered under their user ID.
    async fn resolve_voter(&self, principal: &Principal) -> AppResult<voter::Model> {
        match principal {
            Principal::Voter(voter) => Ok(voter.clone()),
            Principal::Admin(user) => self
                .voter_repo
                .find_by_voter_id(&user.id)
                .await?
                .ok_or_else(|| {
                    AppError::Forbidden(
                        "Admin is not registered as a voter. Register as a voter to vote."
                            .to_string(),
                    )
                }),
        }
    }

    async fn broadcast(&self, results: &ElectionResults) {
        if let Err(e) = self.publisher.publish_vote_update(results).await {
            warn!(error = %e, election_id = results.election_id, "Failed to publish vote update");
        }
        if let Err(e) = self.publisher.publish_results_update(results).await {
            warn!(error = %e, election_id = results.election_id, "Failed to publish results update");
        }
    }
}
