//! Audit log endpoint.

use axum::{
    Router,
    extract::{Query, State},
    routing::get,
};
use ballotbox_common::AppResult;
use ballotbox_core::AuditLogEntry;
use serde::Deserialize;

use crate::{extractors::AdminUser, middleware::AppState, response::ApiResponse};

/// Audit log query.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogQuery {
    pub election_id: i32,
    #[serde(default)]
    pub limit: Option<u64>,
    /// Return decisions older than this id.
    #[serde(default)]
    pub until_id: Option<i32>,
}

/// One page of the recorded decisions of an election, newest first.
async fn list(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
    Query(query): Query<AuditLogQuery>,
) -> AppResult<ApiResponse<Vec<AuditLogEntry>>> {
    let logs = state
        .audit_service
        .logs(query.election_id, query.limit, query.until_id)
        .await?;
    Ok(ApiResponse::ok(logs))
}

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list))
}
