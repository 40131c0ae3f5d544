//! Data models for issues and digests.
//!
//! `IssueRecord` is what an issue source hands over, loosely typed and
//! possibly incomplete. `Issue` is the validated form the aggregator works
//! on. Everything under `ReportDigest` is owned by the digest, so later
//! changes to the source data never leak into a report already built.

use crate::error::InvalidInputError;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Label used when an issue has no assignee.
pub const UNASSIGNED: &str = "Unassigned";

/// A raw issue record as supplied by an issue source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
    pub key: Option<String>,
    pub summary: Option<String>,
    pub status: Option<String>,
    pub assignee: Option<String>,
    pub priority: Option<String>,
    /// Creation timestamp as text (RFC 3339, Jira's `+0000` form, or a bare date).
    pub created: Option<String>,
    /// Due date as text, usually `YYYY-MM-DD`.
    pub due_date: Option<String>,
    pub project_key: Option<String>,
}

/// A single tracked work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Project-prefixed identifier, e.g. `DEVOPS-123`.
    pub key: String,
    /// One-line summary (display only).
    pub summary: String,
    /// Status label, compared case-sensitively.
    pub status: String,
    /// Assignee display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,
    pub project_key: String,
}

impl Issue {
    /// Validate a raw record.
    ///
    /// `project_key` is the project being aggregated; it is used for error
    /// context and as the issue's project when the record does not name one.
    pub fn try_from_record(
        record: &IssueRecord,
        project_key: &str,
    ) -> Result<Self, InvalidInputError> {
        let key = non_blank(record.key.as_deref())
            .ok_or_else(|| InvalidInputError::new(project_key, None, "missing issue key"))?;

        let fail = |reason: String| InvalidInputError::new(project_key, Some(key), reason);

        let status = record
            .status
            .as_deref()
            .filter(|s| non_blank(Some(s)).is_some())
            .ok_or_else(|| fail("missing status".to_string()))?;

        let created_raw = non_blank(record.created.as_deref())
            .ok_or_else(|| fail("missing created_at".to_string()))?;
        let created_at = parse_timestamp(created_raw)
            .ok_or_else(|| fail(format!("malformed created_at '{}'", created_raw)))?;

        let due_at = match non_blank(record.due_date.as_deref()) {
            Some(raw) => Some(
                parse_timestamp(raw).ok_or_else(|| fail(format!("malformed due date '{}'", raw)))?,
            ),
            None => None,
        };

        Ok(Self {
            key: key.to_string(),
            summary: record.summary.clone().unwrap_or_default(),
            status: status.to_string(),
            assignee: record.assignee.clone(),
            priority: record.priority.clone(),
            created_at,
            due_at,
            project_key: non_blank(record.project_key.as_deref())
                .unwrap_or(project_key)
                .to_string(),
        })
    }

    /// Assignee name for grouping, or the `Unassigned` sentinel.
    pub fn assignee_label(&self) -> &str {
        non_blank(self.assignee.as_deref()).unwrap_or(UNASSIGNED)
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Parse a tracker timestamp and normalize it to UTC.
///
/// Accepts RFC 3339, Jira's `2024-01-15T10:30:00.000+0000`, and bare
/// `YYYY-MM-DD` dates (taken as midnight UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// One row of a count/percentage breakdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountEntry {
    pub label: String,
    pub count: usize,
    /// Share of the total, rounded to one decimal.
    pub percentage: f64,
}

/// An in-progress issue with its schedule flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InProgressIssue {
    pub issue: Issue,
    pub missing_due_date: bool,
    pub behind_schedule: bool,
}

/// An open issue older than the backlog threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklogIssue {
    pub issue: Issue,
    pub age_days: i64,
}

/// The aggregated report for one project in one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDigest {
    pub generated_at: DateTime<Utc>,
    pub project_key: String,
    pub total_issues: usize,
    /// Threshold the backlog section was computed with.
    pub backlog_threshold_days: i64,
    pub status_summary: Vec<CountEntry>,
    pub blocked_issues: Vec<Issue>,
    pub in_progress_issues: Vec<InProgressIssue>,
    pub old_backlog_issues: Vec<BacklogIssue>,
    pub assignee_distribution: Vec<CountEntry>,
}

impl ReportDigest {
    /// Number of in-progress issues without a due date.
    pub fn missing_due_date_count(&self) -> usize {
        self.in_progress_issues
            .iter()
            .filter(|i| i.missing_due_date)
            .count()
    }

    /// Number of in-progress issues past their due date.
    pub fn behind_schedule_count(&self) -> usize {
        self.in_progress_issues
            .iter()
            .filter(|i| i.behind_schedule)
            .count()
    }
}

/// A project that could not be reported in this run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFailure {
    pub project_key: String,
    pub error: String,
}

/// Everything produced by one run across all projects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyDigest {
    /// Local calendar date of the run, `YYYY-MM-DD`.
    pub date: String,
    pub generated_at: DateTime<Utc>,
    pub projects: Vec<ReportDigest>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<ProjectFailure>,
}

impl DailyDigest {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}
