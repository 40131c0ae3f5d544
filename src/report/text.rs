//! Plain text digest, used for the email text part and terminal output.

use super::{format_timestamp, truncate_chars, BACKLOG_LIMIT, BLOCKED_LIMIT};
use crate::models::{DailyDigest, Issue, ProjectFailure, ReportDigest};

const RULE_WIDTH: usize = 80;

/// Render the whole digest as plain text.
pub fn format_digest_as_text(digest: &DailyDigest) -> String {
    let rule = "=".repeat(RULE_WIDTH);
    let mut output = String::new();

    output.push_str(&format!("{rule}\nJIRA DAILY DIGEST - {}\n{rule}\n\n", digest.date));

    for project in &digest.projects {
        output.push_str(&generate_project_section(project));
    }

    if digest.has_failures() {
        output.push_str(&generate_failures_section(&digest.failures));
    }

    output.push_str(&format!(
        "{rule}\nReport generated at: {}\n{rule}\n",
        format_timestamp(&digest.generated_at)
    ));

    output
}

fn generate_project_section(project: &ReportDigest) -> String {
    let mut section = String::new();

    section.push_str(&format!("📊 PROJECT: {}\n", project.project_key));
    section.push_str(&"-".repeat(RULE_WIDTH));
    section.push('\n');

    section.push_str(&format!(
        "\n📈 STATUS SUMMARY (Total: {} issues)\n",
        project.total_issues
    ));
    for entry in &project.status_summary {
        section.push_str(&format!(
            "  • {}: {} ({:.1}%)\n",
            entry.label, entry.count, entry.percentage
        ));
    }

    if !project.blocked_issues.is_empty() {
        section.push_str(&format!(
            "\n🚫 BLOCKED ISSUES: {}\n",
            project.blocked_issues.len()
        ));
        for issue in project.blocked_issues.iter().take(BLOCKED_LIMIT) {
            section.push_str(&format!(
                "  • {}: {} (Assignee: {}{})\n",
                issue.key,
                truncate_chars(&issue.summary, 60),
                issue.assignee_label(),
                priority_suffix(issue)
            ));
        }
    }

    section.push_str(&format!(
        "\n🔄 IN PROGRESS: {}\n",
        project.in_progress_issues.len()
    ));
    let missing = project.missing_due_date_count();
    if missing > 0 {
        section.push_str(&format!("  ⚠️  {} issues without dates\n", missing));
    }
    let behind = project.behind_schedule_count();
    if behind > 0 {
        section.push_str(&format!("  ⚠️  {} issues behind schedule\n", behind));
    }

    if !project.old_backlog_issues.is_empty() {
        section.push_str(&format!(
            "\n⏰ OLD BACKLOG (>{} days): {}\n",
            project.backlog_threshold_days,
            project.old_backlog_issues.len()
        ));
        for backlog in project.old_backlog_issues.iter().take(BACKLOG_LIMIT) {
            section.push_str(&format!(
                "  • {}: {} days old - {}\n",
                backlog.issue.key,
                backlog.age_days,
                truncate_chars(&backlog.issue.summary, 50)
            ));
        }
    }

    if !project.assignee_distribution.is_empty() {
        section.push_str("\n👥 ASSIGNEE DISTRIBUTION\n");
        for entry in &project.assignee_distribution {
            section.push_str(&format!(
                "  • {}: {} ({:.1}%)\n",
                entry.label, entry.count, entry.percentage
            ));
        }
    }

    section.push('\n');
    section
}

fn priority_suffix(issue: &Issue) -> String {
    issue
        .priority
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!(", Priority: {}", p))
        .unwrap_or_default()
}

fn generate_failures_section(failures: &[ProjectFailure]) -> String {
    let mut section = format!("❌ FAILED PROJECTS: {}\n", failures.len());
    for failure in failures {
        section.push_str(&format!("  • {}: {}\n", failure.project_key, failure.error));
    }
    section.push('\n');
    section
}
