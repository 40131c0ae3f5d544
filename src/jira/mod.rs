//! Jira REST API access.
//!
//! Paginated issue search, project discovery and conversion of Jira issues
//! into the records the aggregator consumes.

pub mod client;
pub mod models;
pub mod query;

pub use client::JiraClient;
