//! Issue aggregation and statistics.
//!
//! Turns one project's issue list into a [`ReportDigest`]. Everything here is
//! pure: the reference time is passed in and nothing outside the arguments
//! is read, so projects can be aggregated in parallel.

use crate::error::InvalidInputError;
use crate::models::{
    BacklogIssue, CountEntry, InProgressIssue, Issue, IssueRecord, ReportDigest,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Status labels and thresholds that drive the digest sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Status selecting the blocked section.
    #[serde(default = "default_blocked_label")]
    pub blocked_status_label: String,

    /// Status selecting the in-progress section.
    #[serde(default = "default_in_progress_label")]
    pub in_progress_status_label: String,

    /// Terminal statuses, never counted as backlog.
    #[serde(default = "default_closed_labels")]
    pub closed_status_labels: BTreeSet<String>,

    /// Minimum age in days (exclusive) for the old-backlog section.
    #[serde(default = "default_backlog_threshold")]
    pub old_backlog_threshold_days: i64,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            blocked_status_label: default_blocked_label(),
            in_progress_status_label: default_in_progress_label(),
            closed_status_labels: default_closed_labels(),
            old_backlog_threshold_days: default_backlog_threshold(),
        }
    }
}

fn default_blocked_label() -> String {
    "Blocked".to_string()
}

fn default_in_progress_label() -> String {
    "In Progress".to_string()
}

fn default_closed_labels() -> BTreeSet<String> {
    ["Done", "Closed", "Resolved"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_backlog_threshold() -> i64 {
    50
}

/// Validate raw records and aggregate them.
///
/// The first malformed record aborts the whole project; no partial digest is
/// returned.
pub fn aggregate(
    records: &[IssueRecord],
    project_key: &str,
    now: DateTime<Utc>,
    config: &AggregationConfig,
) -> Result<ReportDigest, InvalidInputError> {
    let issues = records
        .iter()
        .map(|record| Issue::try_from_record(record, project_key))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(aggregate_issues(&issues, project_key, now, config))
}

/// Aggregate already-validated issues.
pub fn aggregate_issues(
    issues: &[Issue],
    project_key: &str,
    now: DateTime<Utc>,
    config: &AggregationConfig,
) -> ReportDigest {
    ReportDigest {
        generated_at: now,
        project_key: project_key.to_string(),
        total_issues: issues.len(),
        backlog_threshold_days: config.old_backlog_threshold_days,
        status_summary: status_summary(issues),
        blocked_issues: blocked_issues(issues, &config.blocked_status_label),
        in_progress_issues: in_progress_issues(issues, &config.in_progress_status_label, now),
        old_backlog_issues: old_backlog_issues(issues, config, now),
        assignee_distribution: assignee_distribution(issues),
    }
}

/// Count issues per status.
pub fn status_summary(issues: &[Issue]) -> Vec<CountEntry> {
    count_by(issues, |issue| issue.status.as_str())
}

/// Count issues per assignee, with unassigned issues under one sentinel label.
pub fn assignee_distribution(issues: &[Issue]) -> Vec<CountEntry> {
    count_by(issues, Issue::assignee_label)
}

/// Issues in the blocked status, oldest first.
pub fn blocked_issues(issues: &[Issue], blocked_label: &str) -> Vec<Issue> {
    let mut blocked: Vec<Issue> = issues
        .iter()
        .filter(|i| i.status == blocked_label)
        .cloned()
        .collect();

    blocked.sort_by_key(|i| i.created_at);
    blocked
}

/// Issues in the in-progress status, in input order, with schedule flags.
pub fn in_progress_issues(
    issues: &[Issue],
    in_progress_label: &str,
    now: DateTime<Utc>,
) -> Vec<InProgressIssue> {
    issues
        .iter()
        .filter(|i| i.status == in_progress_label)
        .map(|issue| InProgressIssue {
            missing_due_date: issue.due_at.is_none(),
            behind_schedule: issue.due_at.is_some_and(|due| due < now),
            issue: issue.clone(),
        })
        .collect()
}

/// Open issues older than the threshold, oldest first.
pub fn old_backlog_issues(
    issues: &[Issue],
    config: &AggregationConfig,
    now: DateTime<Utc>,
) -> Vec<BacklogIssue> {
    let mut old: Vec<BacklogIssue> = issues
        .iter()
        .filter(|i| !config.closed_status_labels.contains(&i.status))
        .map(|issue| BacklogIssue {
            age_days: age_in_days(issue.created_at, now),
            issue: issue.clone(),
        })
        .filter(|b| b.age_days > config.old_backlog_threshold_days)
        .collect();

    old.sort_by(|a, b| {
        b.age_days
            .cmp(&a.age_days)
            .then_with(|| a.issue.created_at.cmp(&b.issue.created_at))
    });
    old
}

/// Whole days between `created_at` and `now`, floored.
///
/// A creation time after `now` (clock skew) yields 0.
pub fn age_in_days(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created_at).num_days().max(0)
}

/// Percentage of `count` in `total`, rounded to one decimal.
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let raw = count as f64 / total as f64 * 100.0;
    (raw * 10.0).round() / 10.0
}

/// Group by a label, then order by count descending and label ascending.
fn count_by<'a, F>(issues: &'a [Issue], label: F) -> Vec<CountEntry>
where
    F: Fn(&'a Issue) -> &'a str,
{
    let total = issues.len();
    if total == 0 {
        return Vec::new();
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for issue in issues {
        *counts.entry(label(issue)).or_default() += 1;
    }

    let mut entries: Vec<CountEntry> = counts
        .into_iter()
        .map(|(label, count)| CountEntry {
            label: label.to_string(),
            count,
            percentage: percentage(count, total),
        })
        .collect();

    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    entries
}
