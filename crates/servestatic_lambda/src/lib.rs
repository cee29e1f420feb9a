//! AWS-oriented adapters and handlers for the static asset publisher.
//!
//! This crate owns runtime integration details (Lambda handler wiring, object
//! store and callback adapters, deadline budgeting) on top of the pure
//! primitives in `servestatic_core`.

pub mod adapters;
pub mod config;
pub mod error;
pub mod handlers;
pub mod logging;
