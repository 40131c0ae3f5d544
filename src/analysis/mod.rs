//! Analysis modules.
//!
//! Aggregation of raw issue lists into per-project digests.

pub mod aggregator;

pub use aggregator::*;
