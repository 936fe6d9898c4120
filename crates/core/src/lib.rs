//! Core ballot logic for ballotbox.
//!
//! Validation, the at-most-once ballot write, tally aggregation and the
//! publishing seam used by the realtime layer.

pub mod principal;
pub mod services;

pub use principal::Principal;
pub use services::*;
