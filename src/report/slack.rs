//! Slack webhook payloads.

use super::{format_timestamp, truncate_chars};
use crate::config::SlackConfig;
use crate::models::{DailyDigest, ReportDigest};
use serde_json::{json, Value};

const STATUS_LIMIT: usize = 5;
const BLOCKED_LIMIT: usize = 3;
const BACKLOG_LIMIT: usize = 2;
const ASSIGNEE_LIMIT: usize = 5;

/// Build a Block Kit payload for the digest.
pub fn build_slack_blocks(digest: &DailyDigest, slack: &SlackConfig) -> Value {
    let mut blocks = vec![
        json!({
            "type": "header",
            "text": {
                "type": "plain_text",
                "text": format!("📊 Jira Daily Digest - {}", digest.date)
            }
        }),
        json!({"type": "divider"}),
    ];

    for project in &digest.projects {
        blocks.extend(project_blocks(project));
        blocks.push(json!({"type": "divider"}));
    }

    if digest.has_failures() {
        let mut text = format!("*❌ Failed Projects:* {}\n", digest.failures.len());
        for failure in &digest.failures {
            text.push_str(&format!(
                "• `{}` - {}\n",
                escape_mrkdwn(&failure.project_key),
                escape_mrkdwn(&failure.error)
            ));
        }
        blocks.push(mrkdwn_section(text));
    }

    blocks.push(json!({
        "type": "context",
        "elements": [{
            "type": "mrkdwn",
            "text": format!("Report generated at {}", format_timestamp(&digest.generated_at))
        }]
    }));

    let mut payload = json!({
        "blocks": blocks,
        "text": format!("Jira Daily Digest - {}", digest.date),
        "username": slack.username,
    });
    add_channel(&mut payload, slack);
    payload
}

fn project_blocks(project: &ReportDigest) -> Vec<Value> {
    let mut blocks = vec![mrkdwn_section(format!(
        "*📁 Project: {}*",
        escape_mrkdwn(&project.project_key)
    ))];

    let mut status = format!(
        "*Status Summary* (Total: {} issues)\n",
        project.total_issues
    );
    for entry in project.status_summary.iter().take(STATUS_LIMIT) {
        status.push_str(&format!(
            "• {}: {} ({:.1}%)\n",
            escape_mrkdwn(&entry.label),
            entry.count,
            entry.percentage
        ));
    }
    blocks.push(mrkdwn_section(status));

    if !project.blocked_issues.is_empty() {
        let mut text = format!("*🚫 Blocked Issues:* {}\n", project.blocked_issues.len());
        for issue in project.blocked_issues.iter().take(BLOCKED_LIMIT) {
            text.push_str(&format!(
                "• `{}` - {}\n",
                escape_mrkdwn(&issue.key),
                escape_mrkdwn(&truncate_chars(&issue.summary, 50))
            ));
        }
        blocks.push(mrkdwn_section(text));
    }

    let missing = project.missing_due_date_count();
    let behind = project.behind_schedule_count();
    if missing > 0 || behind > 0 {
        let mut text = format!(
            "*🔄 In Progress Issues:* {}\n",
            project.in_progress_issues.len()
        );
        if missing > 0 {
            text.push_str(&format!("⚠️ {} without dates\n", missing));
        }
        if behind > 0 {
            text.push_str(&format!("⚠️ {} behind schedule\n", behind));
        }
        blocks.push(mrkdwn_section(text));
    }

    if !project.old_backlog_issues.is_empty() {
        let mut text = format!(
            "*⏰ Old Backlog* (>{} days): {} issues\n",
            project.backlog_threshold_days,
            project.old_backlog_issues.len()
        );
        for backlog in project.old_backlog_issues.iter().take(BACKLOG_LIMIT) {
            text.push_str(&format!(
                "• `{}` - {} days old\n",
                escape_mrkdwn(&backlog.issue.key),
                backlog.age_days
            ));
        }
        blocks.push(mrkdwn_section(text));
    }

    if !project.assignee_distribution.is_empty() {
        let mut text = "*👥 Assignees*\n".to_string();
        for entry in project.assignee_distribution.iter().take(ASSIGNEE_LIMIT) {
            text.push_str(&format!(
                "• {}: {} ({:.1}%)\n",
                escape_mrkdwn(&entry.label),
                entry.count,
                entry.percentage
            ));
        }
        blocks.push(mrkdwn_section(text));
    }

    blocks
}

/// Build a single-message payload with headline numbers only.
pub fn build_slack_text(digest: &DailyDigest, slack: &SlackConfig) -> Value {
    let mut lines = vec![format!("📊 *Jira Daily Digest - {}*\n", digest.date)];

    for project in &digest.projects {
        lines.push(format!("\n*Project: {}*", escape_mrkdwn(&project.project_key)));
        lines.push(format!("📈 Total Issues: {}", project.total_issues));

        if !project.blocked_issues.is_empty() {
            lines.push(format!("🚫 Blocked: {}", project.blocked_issues.len()));
        }

        if !project.in_progress_issues.is_empty() {
            lines.push(format!(
                "🔄 In Progress: {}",
                project.in_progress_issues.len()
            ));
            let missing = project.missing_due_date_count();
            if missing > 0 {
                lines.push(format!("  ⚠️ {} without dates", missing));
            }
        }

        if !project.old_backlog_issues.is_empty() {
            lines.push(format!(
                "⏰ Old Backlog (>{}d): {}",
                project.backlog_threshold_days,
                project.old_backlog_issues.len()
            ));
        }
    }

    if digest.has_failures() {
        let keys: Vec<String> = digest
            .failures
            .iter()
            .map(|f| escape_mrkdwn(&f.project_key))
            .collect();
        lines.push(format!("\n❌ Failed: {}", keys.join(", ")));
    }

    lines.push(format!(
        "\n_Generated at {}_",
        format_timestamp(&digest.generated_at)
    ));

    let mut payload = json!({
        "text": lines.join("\n"),
        "username": slack.username,
    });
    add_channel(&mut payload, slack);
    payload
}

fn mrkdwn_section(text: String) -> Value {
    json!({
        "type": "section",
        "text": {"type": "mrkdwn", "text": text}
    })
}

/// Escape the characters Slack treats as control sequences in mrkdwn.
fn escape_mrkdwn(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn add_channel(payload: &mut Value, slack: &SlackConfig) {
    if let (Some(channel), Some(obj)) = (slack.channel.as_ref(), payload.as_object_mut()) {
        obj.insert("channel".to_string(), Value::String(channel.clone()));
    }
}
