//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// jira-digest - daily Jira status digests by email and Slack
///
/// Queries Jira for each configured project, summarizes statuses, blocked
/// work, in-progress schedule risks, stale backlog and assignee load, and
/// delivers the digest.
///
/// Examples:
///   jira-digest
///   jira-digest --projects DEVOPS,EIT --dry-run
///   jira-digest --format html --output digest.html --no-email --no-slack
///   jira-digest --schedule --at 08:30
///   jira-digest --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for .jira-digest.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Project keys to report on (comma-separated)
    ///
    /// Overrides [report].projects from the config file.
    #[arg(short, long, value_name = "KEYS", value_delimiter = ',')]
    pub projects: Option<Vec<String>>,

    /// Format used for --output and --dry-run
    #[arg(long, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Also write the rendered digest to this file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Build and print the digest without sending email or Slack messages
    #[arg(long)]
    pub dry_run: bool,

    /// Keep running and send the digest every day
    #[arg(long)]
    pub schedule: bool,

    /// Time of day for scheduled runs (HH:MM, local time)
    #[arg(long, value_name = "HH:MM")]
    pub at: Option<String>,

    /// With --schedule, also run once immediately
    #[arg(long)]
    pub run_now: bool,

    /// Skip email delivery
    #[arg(long)]
    pub no_email: bool,

    /// Skip Slack delivery
    #[arg(long)]
    pub no_slack: bool,

    /// Age in days after which open issues count as old backlog
    #[arg(long, value_name = "DAYS")]
    pub threshold_days: Option<i64>,

    /// Jira base URL
    #[arg(long, env = "JIRA_SERVER", value_name = "URL")]
    pub jira_server: Option<String>,

    /// Jira account email
    #[arg(long, env = "JIRA_EMAIL", value_name = "EMAIL")]
    pub jira_email: Option<String>,

    /// Jira API token
    #[arg(long, env = "JIRA_API_TOKEN", hide_env_values = true, value_name = "TOKEN")]
    pub jira_token: Option<String>,

    /// SMTP password
    #[arg(long, env = "SMTP_PASSWORD", hide_env_values = true, value_name = "PASSWORD")]
    pub smtp_password: Option<String>,

    /// Slack incoming webhook URL
    #[arg(long, env = "SLACK_WEBHOOK_URL", hide_env_values = true, value_name = "URL")]
    pub slack_webhook: Option<String>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .jira-digest.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Render format for the digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain text (default)
    #[default]
    Text,
    /// HTML document
    Html,
    /// JSON dump of the digest
    Json,
    /// Slack Block Kit payload
    Slack,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.run_now && !self.schedule {
            return Err("--run-now requires --schedule".to_string());
        }

        if self.dry_run && self.schedule {
            return Err("Cannot use both --dry-run and --schedule".to_string());
        }

        if let Some(ref at) = self.at {
            if crate::scheduler::parse_schedule_time(at).is_err() {
                return Err(format!("Invalid --at time '{}', expected HH:MM", at));
            }
        }

        if let Some(days) = self.threshold_days {
            if days < 1 {
                return Err("Threshold must be at least 1 day".to_string());
            }
        }

        if let Some(ref projects) = self.projects {
            if projects.iter().all(|p| p.trim().is_empty()) {
                return Err("--projects contains no project keys".to_string());
            }
        }

        if let Some(ref server) = self.jira_server {
            if !server.starts_with("http://") && !server.starts_with("https://") {
                return Err("Jira URL must start with 'http://' or 'https://'".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
