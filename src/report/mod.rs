//! Digest rendering.
//!
//! Turns a [`DailyDigest`] into plain text, HTML, Slack payloads or JSON.

pub mod html;
pub mod slack;
pub mod text;

pub use html::format_digest_as_html;
pub use slack::{build_slack_blocks, build_slack_text};
pub use text::format_digest_as_text;

use crate::cli::OutputFormat;
use crate::config::SlackConfig;
use crate::models::DailyDigest;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::Path;

/// Blocked issues listed per project in text and HTML.
pub const BLOCKED_LIMIT: usize = 5;

/// Old backlog issues listed per project in text and HTML.
pub const BACKLOG_LIMIT: usize = 3;

/// Generate a JSON report.
pub fn generate_json_report(digest: &DailyDigest) -> Result<String> {
    serde_json::to_string_pretty(digest).map_err(Into::into)
}

/// Render the digest in the requested format.
pub fn render(digest: &DailyDigest, format: OutputFormat, slack: &SlackConfig) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(format_digest_as_text(digest)),
        OutputFormat::Html => Ok(format_digest_as_html(digest)),
        OutputFormat::Json => generate_json_report(digest),
        OutputFormat::Slack => {
            let payload = if slack.simple {
                build_slack_text(digest, slack)
            } else {
                build_slack_blocks(digest, slack)
            };
            serde_json::to_string_pretty(&payload).map_err(Into::into)
        }
    }
}

/// Write rendered output to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

/// Cut `text` to at most `max_chars` characters, marking the cut with `...`.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
