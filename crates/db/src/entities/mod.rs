//! Database entities.

#![allow(missing_docs)]

pub mod candidate;
pub mod election;
pub mod portfolio;
pub mod user;
pub mod vote;
pub mod vote_action;
pub mod voter;
pub mod voter_election;

pub use candidate::Entity as Candidate;
pub use election::Entity as Election;
pub use portfolio::Entity as Portfolio;
pub use user::Entity as User;
pub use vote::Entity as Vote;
pub use vote_action::Entity as VoteAction;
pub use voter::Entity as Voter;
pub use voter_election::Entity as VoterElection;
