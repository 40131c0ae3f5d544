//! HTML digest for the email body.

use super::{format_timestamp, truncate_chars, BACKLOG_LIMIT, BLOCKED_LIMIT};
use crate::models::{DailyDigest, ProjectFailure, ReportDigest};

const STYLE: &str = "\
body { font-family: Arial, sans-serif; margin: 20px; }
h1 { color: #0052CC; border-bottom: 3px solid #0052CC; }
h2 { color: #172B4D; margin-top: 30px; }
h3 { color: #5E6C84; }
.status-item { margin: 10px 0; padding: 10px; background: #F4F5F7; border-radius: 3px; }
.issue-item { margin: 5px 0; padding: 8px; background: #FAFBFC; border-left: 3px solid #0052CC; }
.warning { border-left-color: #FF5630; }
.blocked { border-left-color: #FF5630; background: #FFEBE6; }
";

/// Render the whole digest as an HTML document.
pub fn format_digest_as_html(digest: &DailyDigest) -> String {
    let mut output = String::new();

    output.push_str("<html><head><meta charset=\"utf-8\"><style>\n");
    output.push_str(STYLE);
    output.push_str("</style></head><body>\n");
    output.push_str(&format!(
        "<h1>📊 JIRA Daily Digest - {}</h1>\n",
        escape_html(&digest.date)
    ));

    for project in &digest.projects {
        output.push_str(&generate_project_section(project));
    }

    if digest.has_failures() {
        output.push_str(&generate_failures_section(&digest.failures));
    }

    output.push_str(&format!(
        "<p><small>Report generated at: {}</small></p>\n",
        format_timestamp(&digest.generated_at)
    ));
    output.push_str("</body></html>\n");

    output
}

fn generate_project_section(project: &ReportDigest) -> String {
    let mut section = String::new();

    section.push_str(&format!(
        "<h2>Project: {}</h2>\n",
        escape_html(&project.project_key)
    ));

    section.push_str(&format!(
        "<h3>📈 Status Summary (Total: {} issues)</h3>\n<div>\n",
        project.total_issues
    ));
    for entry in &project.status_summary {
        section.push_str(&format!(
            "<div class='status-item'><strong>{}:</strong> {} issues ({:.1}%)</div>\n",
            escape_html(&entry.label),
            entry.count,
            entry.percentage
        ));
    }
    section.push_str("</div>\n");

    if !project.blocked_issues.is_empty() {
        section.push_str(&format!(
            "<h3>🚫 Blocked Issues: {}</h3>\n",
            project.blocked_issues.len()
        ));
        for issue in project.blocked_issues.iter().take(BLOCKED_LIMIT) {
            section.push_str(&format!(
                "<div class='issue-item blocked'><strong>{}:</strong> {}<br/><small>Assignee: {}{}</small></div>\n",
                escape_html(&issue.key),
                escape_html(&truncate_chars(&issue.summary, 60)),
                escape_html(issue.assignee_label()),
                issue
                    .priority
                    .as_deref()
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(|p| format!(" | Priority: {}", escape_html(p)))
                    .unwrap_or_default()
            ));
        }
    }

    section.push_str(&format!(
        "<h3>🔄 In Progress: {}</h3>\n",
        project.in_progress_issues.len()
    ));
    let missing = project.missing_due_date_count();
    if missing > 0 {
        section.push_str(&format!(
            "<div class='issue-item warning'>⚠️ {} issues without dates</div>\n",
            missing
        ));
    }
    let behind = project.behind_schedule_count();
    if behind > 0 {
        section.push_str(&format!(
            "<div class='issue-item warning'>⚠️ {} issues behind schedule</div>\n",
            behind
        ));
    }

    if !project.old_backlog_issues.is_empty() {
        section.push_str(&format!(
            "<h3>⏰ Old Backlog (&gt;{} days): {}</h3>\n",
            project.backlog_threshold_days,
            project.old_backlog_issues.len()
        ));
        for backlog in project.old_backlog_issues.iter().take(BACKLOG_LIMIT) {
            section.push_str(&format!(
                "<div class='issue-item'><strong>{}:</strong> {} days old<br/>{}</div>\n",
                escape_html(&backlog.issue.key),
                backlog.age_days,
                escape_html(&truncate_chars(&backlog.issue.summary, 60))
            ));
        }
    }

    if !project.assignee_distribution.is_empty() {
        section.push_str("<h3>👥 Assignee Distribution</h3>\n<div>\n");
        for entry in &project.assignee_distribution {
            section.push_str(&format!(
                "<div class='status-item'><strong>{}:</strong> {} issues ({:.1}%)</div>\n",
                escape_html(&entry.label),
                entry.count,
                entry.percentage
            ));
        }
        section.push_str("</div>\n");
    }

    section
}

fn generate_failures_section(failures: &[ProjectFailure]) -> String {
    let mut section = format!("<h2>❌ Failed Projects: {}</h2>\n", failures.len());
    for failure in failures {
        section.push_str(&format!(
            "<div class='issue-item warning'><strong>{}:</strong> {}</div>\n",
            escape_html(&failure.project_key),
            escape_html(&failure.error)
        ));
    }
    section
}

/// Escape text for use in HTML element content and quoted attributes.
fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::fixtures::sample_digest;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("a < b & c"), "a &lt; b &amp; c");
        assert_eq!(escape_html("it's \"x\""), "it&#39;s &quot;x&quot;");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_format_digest_as_html() {
        let html = format_digest_as_html(&sample_digest());

        assert!(html.starts_with("<html>"));
        assert!(html.contains("JIRA Daily Digest - 2024-06-01"));
        assert!(html.contains("<h2>Project: DEVOPS</h2>"));
        assert!(html.contains("<strong>In Progress:</strong> 2 issues (50.0%)"));
        assert!(html.contains("Blocked Issues: 1"));
        assert!(html.contains("1 issues behind schedule"));
        assert!(html.contains("143 days old"));
        assert!(html.trim_end().ends_with("</body></html>"));
    }

    #[test]
    fn test_tracker_text_is_escaped() {
        let html = format_digest_as_html(&sample_digest());
        assert!(html.contains("Waiting on &lt;vendor&gt; &amp; legal"));
        assert!(!html.contains("<vendor>"));
    }

    #[test]
    fn test_failures_section() {
        let html = format_digest_as_html(&sample_digest());
        assert!(html.contains("Failed Projects: 1"));
        assert!(html.contains("<strong>EIT:</strong>"));
    }

    #[test]
    fn test_assignee_distribution_section() {
        let html = format_digest_as_html(&sample_digest());
        assert!(html.contains("<h3>👥 Assignee Distribution</h3>"));
        assert!(html.contains("<strong>Ana Lima:</strong> 2 issues (50.0%)"));
        assert!(html.contains("<strong>Unassigned:</strong> 2 issues (50.0%)"));
    }

    #[test]
    fn test_blocked_line_shows_priority() {
        let html = format_digest_as_html(&sample_digest());
        assert!(html.contains("Assignee: Unassigned | Priority: Medium"));
    }
}
