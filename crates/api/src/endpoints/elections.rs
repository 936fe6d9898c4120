//! Election directory endpoints.

use axum::{
    Router,
    extract::{Path, State},
    routing::{get, post},
};
use ballotbox_common::AppResult;
use ballotbox_core::{BallotSheet, ElectionListing, Registration};
use tracing::info;

use crate::{
    extractors::{AdminUser, AuthPrincipal},
    middleware::AppState,
    response::ApiResponse,
};

/// Elections visible to the caller.
async fn list(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<Vec<ElectionListing>>> {
    let elections = state.election_service.list_for(&principal).await?;
    Ok(ApiResponse::ok(elections))
}

/// Portfolios and candidates of an election.
async fn ballot(
    AuthPrincipal(_principal): AuthPrincipal,
    State(state): State<AppState>,
    Path(election_id): Path<i32>,
) -> AppResult<ApiResponse<BallotSheet>> {
    let sheet = state.election_service.ballot_sheet(election_id).await?;
    Ok(ApiResponse::ok(sheet))
}

/// Register a voter for an election.
async fn register_voter(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path((election_id, voter_id)): Path<(i32, i32)>,
) -> AppResult<ApiResponse<Registration>> {
    let registration = state
        .election_service
        .register_voter(election_id, voter_id)
        .await?;

    info!(
        admin_id = %admin.id,
        election_id,
        voter_id,
        created = registration.created,
        "Voter registration requested"
    );

    Ok(if registration.created {
        ApiResponse::created(registration)
    } else {
        ApiResponse::ok(registration)
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/{id}/ballot", get(ballot))
        .route("/{id}/voters/{voter_id}", post(register_voter))
}
