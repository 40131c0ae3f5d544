//! Error types for the tracker client, the aggregator and delivery.
//!
//! Application plumbing uses `anyhow`; these are the errors callers
//! match on.

use reqwest::StatusCode;
use thiserror::Error;

/// A malformed issue record aborted aggregation for one project.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error(
    "invalid issue record in project {project_key} (issue {}): {reason}",
    .issue_key.as_deref().unwrap_or("<unknown>")
)]
pub struct InvalidInputError {
    /// Project whose aggregation was aborted.
    pub project_key: String,
    /// Key of the offending record, if it had one.
    pub issue_key: Option<String>,
    /// What was wrong with the record.
    pub reason: String,
}

impl InvalidInputError {
    pub fn new<S: Into<String>>(project_key: &str, issue_key: Option<&str>, reason: S) -> Self {
        Self {
            project_key: project_key.to_string(),
            issue_key: issue_key.map(String::from),
            reason: reason.into(),
        }
    }
}

/// Errors from the Jira REST client.
#[derive(Error, Debug)]
pub enum JiraError {
    #[error("HTTP {status}: {body}")]
    Http { status: StatusCode, body: String },

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("max retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },
}

/// Errors from the email and webhook channels.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("invalid email address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build email: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("webhook request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("webhook returned HTTP {status}: {body}")]
    Webhook { status: StatusCode, body: String },

    #[error("no recipients configured")]
    NoRecipients,
}
