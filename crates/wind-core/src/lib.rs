//! Core data types and statistics for wind telemetry
//!
//! This crate provides the normalized sample model and the pure
//! aggregation math shared by every transport. It performs no I/O.

pub mod stats;
pub mod types;

pub use stats::*;
pub use types::*;
