//! Dashboard endpoints.

use axum::{Router, extract::State, routing::get};
use ballotbox_common::AppResult;
use ballotbox_core::{AdminDashboard, VoterDashboard};

use crate::{
    extractors::{AdminUser, AuthPrincipal},
    middleware::AppState,
    response::ApiResponse,
};

async fn admin(
    AdminUser(_admin): AdminUser,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<AdminDashboard>> {
    let dashboard = state.dashboard_service.admin().await?;
    Ok(ApiResponse::ok(dashboard))
}

async fn voter(
    AuthPrincipal(principal): AuthPrincipal,
    State(state): State<AppState>,
) -> AppResult<ApiResponse<VoterDashboard>> {
    let dashboard = state.dashboard_service.voter(&principal).await?;
    Ok(ApiResponse::ok(dashboard))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/admin", get(admin))
        .route("/voter", get(voter))
}
