//! Audit trail endpoint.

use axum::{
    Router,
    extract::{Query, State},
    routing::get,
};
use ballotbox_common::AppResult;
use ballotbox_core::AuditTrail;
use serde::Deserialize;
use tracing::info;

use crate::{extractors::SuperAdminUser, middleware::AppState, response::ApiResponse};

/// Audit trail query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditTrailQuery {
    /// Limit registrations and decisions to one election.
    #[serde(default)]
    pub election_id: Option<i32>,
}

/// Every voter with their registrations and decisions.
async fn trail(
    SuperAdminUser(admin): SuperAdminUser,
    State(state): State<AppState>,
    Query(query): Query<AuditTrailQuery>,
) -> AppResult<ApiResponse<AuditTrail>> {
    info!(admin = %admin.id, election_id = ?query.election_id, "Audit trail requested");
    let trail = state.audit_service.trail(query.election_id).await?;
    Ok(ApiResponse::ok(trail))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(trail))
}
