//! Ballot submission endpoint.

use axum::{Json, Router, extract::State, routing::post};
use ballotbox_common::AppResult;
use ballotbox_core::{BallotReceipt, SubmitBallotInput};
use tracing::debug;

use crate::{extractors::AuthPrincipal, middleware::AppState, response::ApiResponse};

/// Submit a ballot.
async fn submit(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
    Json(input): Json<SubmitBallotInput>,
) -> AppResult<ApiResponse<BallotReceipt>> {
    debug!(
        principal = %principal.log_id(),
        election_id = input.election_id,
        entries = input.votes.len(),
        "Ballot submitted"
    );

    let receipt = state.ballot_service.submit(&principal, input).await?;
    Ok(ApiResponse::created(receipt))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(submit))
}
