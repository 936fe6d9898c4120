//! Results publisher.
//!
//! Provides an abstraction for pushing recomputed tallies to realtime
//! subscribers. The actual implementation lives in the API crate's streaming
//! layer.

use async_trait::async_trait;
use ballotbox_common::AppResult;
use std::sync::Arc;

use super::tally::ElectionResults;

/// Channel an update is published on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResultsChannel {
    /// Live voting view, `election:{id}`.
    Election,
    /// Results view, `results:{id}`.
    Results,
}

impl ResultsChannel {
    /// Event name delivered to subscribers of this channel.
    #[must_use]
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::Election => "voteUpdate",
            Self::Results => "resultsUpdate",
        }
    }

    /// Topic key for an election.
    #[must_use]
    pub fn topic(self, election_id: i32) -> String {
        match self {
            Self::Election => format!("election:{election_id}"),
            Self::Results => format!("results:{election_id}"),
        }
    }
}

/// Trait for publishing tally updates.
///
/// Publishing is best-effort: callers log failures and carry on.
#[async_trait]
pub trait ResultsPublisher: Send + Sync {
    /// Publish results to the live voting channel of their election.
    async fn publish_vote_update(&self, results: &ElectionResults) -> AppResult<()>;

    /// Publish results to the results channel of their election.
    async fn publish_results_update(&self, results: &ElectionResults) -> AppResult<()>;
}

/// A no-op publisher for tests or when realtime updates are disabled.
#[derive(Clone, Default)]
pub struct NoOpResultsPublisher;

#[async_trait]
impl ResultsPublisher for NoOpResultsPublisher {
    async fn publish_vote_update(&self, _results: &ElectionResults) -> AppResult<()> {
        Ok(())
    }

    async fn publish_results_update(&self, _results: &ElectionResults) -> AppResult<()> {
        Ok(())
    }
}

/// Shared handle to a results publisher.
pub type ResultsPublisherService = Arc<dyn ResultsPublisher>;
