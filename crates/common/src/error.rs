//! Error types for ballotbox.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Application result type.
pub type AppResult<T> = Result<T, AppError>;

/// Application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // === Client Errors ===
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // === Ballot Errors ===
    #[error("Election not found: {0}")]
    ElectionNotFound(i32),

    #[error("Election is not active (status: {0})")]
    ElectionNotActive(String),

    #[error("Election is not currently open for voting")]
    ElectionWindowClosed,

    #[error("Portfolio {0} not found in this election")]
    UnknownPortfolio(i32),

    #[error("Invalid candidate binding: {0}")]
    InvalidCandidateBinding(String),

    #[error("Malformed ballot: {0}")]
    MalformedBallot(String),

    #[error("Voter not found: {0}")]
    VoterNotFound(String),

    #[error("Voter has already voted in this election")]
    DuplicateVote,

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// The commit itself failed; the write may or may not have landed.
    #[error("Transaction outcome unknown: {0}")]
    TransactionOutcomeUnknown(String),

    // === Server Errors ===
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            // 4xx Client Errors
            Self::NotFound(_) | Self::ElectionNotFound(_) | Self::VoterNotFound(_) => {
                StatusCode::NOT_FOUND
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_)
            | Self::Validation(_)
            | Self::ElectionNotActive(_)
            | Self::ElectionWindowClosed
            | Self::UnknownPortfolio(_)
            | Self::InvalidCandidateBinding(_)
            | Self::MalformedBallot(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) | Self::DuplicateVote => StatusCode::CONFLICT,

            // 5xx Server Errors
            Self::TransactionFailed(_)
            | Self::TransactionOutcomeUnknown(_)
            | Self::Database(_)
            | Self::Config(_)
            | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden(_) => "FORBIDDEN",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::ElectionNotFound(_) => "ELECTION_NOT_FOUND",
            Self::ElectionNotActive(_) => "ELECTION_NOT_ACTIVE",
            Self::ElectionWindowClosed => "ELECTION_WINDOW_CLOSED",
            Self::UnknownPortfolio(_) => "UNKNOWN_PORTFOLIO",
            Self::InvalidCandidateBinding(_) => "INVALID_CANDIDATE_BINDING",
            Self::MalformedBallot(_) => "MALFORMED_BALLOT",
            Self::VoterNotFound(_) => "VOTER_NOT_FOUND",
            Self::DuplicateVote => "DUPLICATE_VOTE",
            Self::TransactionFailed(_) => "TRANSACTION_FAILED",
            Self::TransactionOutcomeUnknown(_) => "TRANSACTION_OUTCOME_UNKNOWN",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Config(_) => "CONFIG_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns whether this error should be logged at error level.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Message safe to show to API clients.
    ///
    /// Server errors never expose storage or configuration details.
    #[must_use]
    pub fn public_message(&self) -> String {
        match self {
            Self::TransactionFailed(_) => {
                "Your ballot could not be recorded. No vote was stored; please try again."
                    .to_string()
            }
            Self::TransactionOutcomeUnknown(_) => {
                "Your ballot may or may not have been recorded. Check your voting status before trying again."
                    .to_string()
            }
            _ if self.is_server_error() => "An internal error occurred".to_string(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        // Log server errors
        if self.is_server_error() {
            tracing::error!(error = %self, code = code, "Server error occurred");
        } else {
            tracing::debug!(error = %self, code = code, "Client error occurred");
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.public_message(),
            }
        }));

        (status, body).into_response()
    }
}

// === From implementations ===

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}
