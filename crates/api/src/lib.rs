//! HTTP API layer for ballotbox.
//!
//! This crate provides the REST API and realtime result streaming:
//!
//! - **Endpoints**: ballot submission, results, election directory, audit log,
//!   audit trail, dashboards
//! - **Extractors**: principal, administrator and super administrator authentication
//! - **Middleware**: bearer token resolution
//! - **Streaming**: WebSocket channels and Server-Sent Events
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod middleware;
pub mod response;
pub mod sse;
pub mod streaming;

pub use endpoints::router;
pub use middleware::{AppState, auth_middleware};
pub use streaming::{StreamingState, streaming_handler};
