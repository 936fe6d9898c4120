//! Repository layer over the sea-orm entities.

#![allow(missing_docs)]

pub mod ballot;
pub mod candidate;
pub mod election;
pub mod portfolio;
pub mod user;
pub mod vote_action;
pub mod voter;
pub mod voter_election;

pub use ballot::{BallotDecision, BallotRepository, RecordedBallot};
pub use candidate::CandidateRepository;
pub use election::ElectionRepository;
pub use portfolio::PortfolioRepository;
pub use user::UserRepository;
pub use vote_action::{DecisionCount, VoteActionRepository};
pub use voter::VoterRepository;
pub use voter_election::VoterElectionRepository;
