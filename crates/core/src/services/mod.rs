//! Business logic services.

#![allow(missing_docs)]

pub mod audit;
pub mod auth;
pub mod ballot;
pub mod ballot_validator;
pub mod dashboard;
pub mod election;
pub mod results_publisher;
pub mod tally;

pub use audit::{
    AuditLogEntry, AuditService, AuditTrail, DEFAULT_AUDIT_LIMIT, DecisionTally, MAX_AUDIT_LIMIT,
    TrailDecision, TrailElection, TrailStats, VoterTrail, trail_stats,
};
pub use auth::AuthService;
pub use ballot::{BallotReceipt, BallotService};
pub use ballot_validator::{BallotDirectory, BallotEntry, SubmitBallotInput, ensure_open};
pub use dashboard::{
    AdminDashboard, DashboardService, DashboardVoter, VoterDashboard, VoterDashboardElection,
};
pub use election::{BallotSheet, BallotSheetPortfolio, ElectionListing, ElectionService, Registration};
pub use results_publisher::{
    NoOpResultsPublisher, ResultsChannel, ResultsPublisher, ResultsPublisherService,
};
pub use tally::{
    CandidateResult, ElectionResults, ElectionSummary, PortfolioResult, TallyService,
    TurnoutSummary, compute_results, percentage,
};
