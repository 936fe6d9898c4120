//! API middleware.

#![allow(missing_docs)]

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use ballotbox_common::AppError;
use ballotbox_core::{
    AuditService, AuthService, BallotService, DashboardService, ElectionService, TallyService,
};
use tracing::warn;

use crate::streaming::StreamingState;

/// Application state.
#[derive(Clone)]
pub struct AppState {
    pub auth_service: AuthService,
    pub ballot_service: BallotService,
    pub tally_service: TallyService,
    pub election_service: ElectionService,
    pub audit_service: AuditService,
    pub dashboard_service: DashboardService,
    pub streaming: StreamingState,
}

/// Authentication middleware.
///
/// Resolves a bearer token to a `Principal` in the request extensions.
/// Requests without a valid token pass through unauthenticated; the
/// extractors decide whether that is acceptable.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    if let Some(auth_header) = req.headers().get(header::AUTHORIZATION)
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        match state.auth_service.authenticate(token.trim()).await {
            Ok(principal) => {
                req.extensions_mut().insert(principal);
            }
            Err(AppError::Unauthorized) => {}
            Err(e) => warn!(error = %e, "Token lookup failed"),
        }
    }

    next.run(req).await
}
