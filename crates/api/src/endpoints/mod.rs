//! API endpoints.

mod audit_logs;
mod audit_trail;
mod dashboards;
mod elections;
mod results;
mod votes;

use axum::Router;

use crate::middleware::AppState;
use crate::sse;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .nest("/votes", votes::router())
        .nest("/results", results::router())
        .nest("/elections", elections::router())
        .nest("/audit-logs", audit_logs::router())
        .nest("/audit-trail", audit_trail::router())
        .nest("/dashboards", dashboards::router())
        .nest("/streaming/sse", sse::router())
}
