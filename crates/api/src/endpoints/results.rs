//! Results endpoint.

use axum::{
    Router,
    extract::{Path, State},
    routing::get,
};
use ballotbox_common::AppResult;
use ballotbox_core::ElectionResults;

use crate::{extractors::AuthPrincipal, middleware::AppState, response::ApiResponse};

/// Freshly computed results of an election.
async fn show(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
    Path(election_id): Path<i32>,
) -> AppResult<ApiResponse<ElectionResults>> {
    let results = state
        .tally_service
        .results_for(&principal, election_id)
        .await?;
    Ok(ApiResponse::ok(results))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", get(show))
}
