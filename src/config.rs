//! Configuration file handling.
//!
//! This module handles loading, validating and merging configuration from
//! `.jira-digest.toml` files.

use crate::analysis::AggregationConfig;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the current directory.
pub const DEFAULT_CONFIG_FILE: &str = ".jira-digest.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Jira connection settings.
    #[serde(default)]
    pub jira: JiraConfig,

    /// Which projects to report on.
    #[serde(default)]
    pub report: ReportConfig,

    /// Status labels and thresholds for the digest sections.
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// SMTP delivery.
    #[serde(default)]
    pub email: EmailConfig,

    /// Slack webhook delivery.
    #[serde(default)]
    pub slack: SlackConfig,

    /// Daily schedule.
    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// Jira connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraConfig {
    /// Base URL, e.g. `https://example.atlassian.net`.
    #[serde(default)]
    pub server: String,

    /// Account email used for basic auth.
    #[serde(default)]
    pub email: String,

    /// API token used for basic auth.
    #[serde(default)]
    pub api_token: String,

    /// Issues requested per search page.
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Retries for transient failures (timeouts, 429, 5xx).
    #[serde(default = "default_retries")]
    pub max_retries: u32,
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            server: String::new(),
            email: String::new(),
            api_token: String::new(),
            page_size: default_page_size(),
            timeout_seconds: default_timeout(),
            max_retries: default_retries(),
        }
    }
}

fn default_page_size() -> usize {
    100
}

fn default_timeout() -> u64 {
    30
}

fn default_retries() -> u32 {
    3
}

/// Report scope settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Project keys to report on. Empty means discover them from Jira.
    #[serde(default)]
    pub projects: Vec<String>,

    /// How many projects to take when discovering.
    #[serde(default = "default_discover_limit")]
    pub discover_limit: usize,

    /// Projects fetched concurrently.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            projects: Vec::new(),
            discover_limit: default_discover_limit(),
            concurrency: default_concurrency(),
        }
    }
}

fn default_discover_limit() -> usize {
    5
}

fn default_concurrency() -> usize {
    4
}

/// SMTP settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// Sender address, also the SMTP login.
    #[serde(default)]
    pub address: Option<String>,

    /// SMTP password or app password.
    #[serde(default)]
    pub password: Option<String>,

    #[serde(default = "default_smtp_server")]
    pub smtp_server: String,

    /// 465 uses implicit TLS, anything else STARTTLS.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub recipients: Vec<String>,

    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            address: None,
            password: None,
            smtp_server: default_smtp_server(),
            smtp_port: default_smtp_port(),
            recipients: Vec::new(),
            subject_prefix: default_subject_prefix(),
        }
    }
}

fn default_smtp_server() -> String {
    "smtp.gmail.com".to_string()
}

fn default_smtp_port() -> u16 {
    587
}

fn default_subject_prefix() -> String {
    "Jira Daily Report".to_string()
}

/// Slack webhook settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlackConfig {
    /// Incoming webhook URL.
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Channel override; the webhook's own channel when unset.
    #[serde(default)]
    pub channel: Option<String>,

    #[serde(default = "default_slack_username")]
    pub username: String,

    /// Send a plain text message instead of Block Kit sections.
    #[serde(default)]
    pub simple: bool,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            channel: None,
            username: default_slack_username(),
            simple: false,
        }
    }
}

fn default_slack_username() -> String {
    "Jira Bot".to_string()
}

/// Schedule settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Local time of day, `HH:MM`.
    #[serde(default = "default_schedule_time")]
    pub time: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            time: default_schedule_time(),
        }
    }
}

fn default_schedule_time() -> String {
    "09:00".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments (and their environment variables) take precedence over
    /// config file settings. Only explicitly provided values override.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref server) = args.jira_server {
            self.jira.server = server.clone();
        }
        if let Some(ref email) = args.jira_email {
            self.jira.email = email.clone();
        }
        if let Some(ref token) = args.jira_token {
            self.jira.api_token = token.clone();
        }

        if let Some(ref projects) = args.projects {
            self.report.projects = projects.clone();
        }

        if let Some(days) = args.threshold_days {
            self.aggregation.old_backlog_threshold_days = days;
        }

        if let Some(ref password) = args.smtp_password {
            self.email.password = Some(password.clone());
        }
        if let Some(ref webhook) = args.slack_webhook {
            self.slack.webhook_url = Some(webhook.clone());
        }

        if let Some(ref at) = args.at {
            self.schedule.time = at.clone();
        }

        self.report.projects = normalize_project_keys(&self.report.projects);
    }

    /// Check that the configuration is usable for a run.
    pub fn validate(&self) -> Result<()> {
        let mut missing = Vec::new();
        if self.jira.server.trim().is_empty() {
            missing.push("jira.server");
        }
        if self.jira.email.trim().is_empty() {
            missing.push("jira.email");
        }
        if self.jira.api_token.trim().is_empty() {
            missing.push("jira.api_token");
        }
        if !missing.is_empty() {
            bail!("Missing required configuration: {}", missing.join(", "));
        }

        if !self.jira.server.starts_with("http://") && !self.jira.server.starts_with("https://") {
            bail!("jira.server must start with 'http://' or 'https://'");
        }

        if self.jira.page_size == 0 {
            bail!("jira.page_size must be at least 1");
        }

        if self.report.concurrency == 0 {
            bail!("report.concurrency must be at least 1");
        }

        if self.email.smtp_port == 0 {
            bail!("email.smtp_port must be non-zero");
        }

        crate::scheduler::parse_schedule_time(&self.schedule.time)
            .with_context(|| format!("Invalid schedule.time '{}'", self.schedule.time))?;

        Ok(())
    }

    /// Email is deliverable: sender credentials and at least one recipient.
    pub fn has_email_config(&self) -> bool {
        let filled = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
        filled(&self.email.address)
            && filled(&self.email.password)
            && !self.email.recipients.is_empty()
    }

    /// Slack is deliverable: a webhook URL is set.
    pub fn has_slack_config(&self) -> bool {
        self.slack
            .webhook_url
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        let body = toml::to_string_pretty(&config).unwrap_or_else(|_| String::new());
        format!(
            "# jira-digest configuration\n\
             # Leave [report].projects empty to report on the first projects Jira lists.\n\
             # Credentials may also come from JIRA_API_TOKEN, SMTP_PASSWORD and SLACK_WEBHOOK_URL.\n\n{}",
            body
        )
    }
}

/// Trim, uppercase and de-duplicate project keys, keeping their order.
pub fn normalize_project_keys(keys: &[String]) -> Vec<String> {
    let mut seen = Vec::new();
    for key in keys {
        let key = key.trim().to_uppercase();
        if !key.is_empty() && !seen.contains(&key) {
            seen.push(key);
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.jira.server = "https://example.atlassian.net".to_string();
        config.jira.email = "bot@example.com".to_string();
        config.jira.api_token = "token".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.jira.page_size, 100);
        assert_eq!(config.email.smtp_server, "smtp.gmail.com");
        assert_eq!(config.email.smtp_port, 587);
        assert_eq!(config.slack.username, "Jira Bot");
        assert_eq!(config.schedule.time, "09:00");
        assert_eq!(config.aggregation.old_backlog_threshold_days, 50);
        assert!(config.aggregation.closed_status_labels.contains("Done"));
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r##"
[jira]
server = "https://example.atlassian.net"
email = "bot@example.com"
api_token = "secret"

[report]
projects = ["DEVOPS", "EIT"]

[aggregation]
blocked_status_label = "Impeded"
closed_status_labels = ["Done", "Won't Do"]
old_backlog_threshold_days = 30

[email]
address = "reports@example.com"
password = "app-password"
smtp_port = 465
recipients = ["team@example.com"]

[slack]
webhook_url = "https://hooks.slack.com/services/T/B/X"
channel = "#devops"
"##;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.report.projects, vec!["DEVOPS", "EIT"]);
        assert_eq!(config.aggregation.blocked_status_label, "Impeded");
        assert_eq!(config.aggregation.in_progress_status_label, "In Progress");
        assert!(config.aggregation.closed_status_labels.contains("Won't Do"));
        assert_eq!(config.aggregation.old_backlog_threshold_days, 30);
        assert_eq!(config.email.smtp_port, 465);
        assert_eq!(config.email.smtp_server, "smtp.gmail.com");
        assert!(config.has_email_config());
        assert!(config.has_slack_config());
        assert_eq!(config.slack.channel.as_deref(), Some("#devops"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[jira]\nserver = \"https://jira.local\"\n\n[schedule]\ntime = \"07:30\"").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.jira.server, "https://jira.local");
        assert_eq!(config.schedule.time, "07:30");
    }

    #[test]
    fn test_load_invalid_file_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[jira\nserver = ").unwrap();
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_validate_missing_credentials() {
        let err = Config::default().validate().unwrap_err().to_string();
        assert!(err.contains("jira.server"));
        assert!(err.contains("jira.api_token"));
    }

    #[test]
    fn test_validate_bad_server_and_schedule() {
        let mut config = valid_config();
        config.jira.server = "example.atlassian.net".to_string();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.schedule.time = "25:00".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_channels_need_complete_settings() {
        let mut config = valid_config();
        config.email.address = Some("reports@example.com".to_string());
        config.email.password = Some("pw".to_string());
        assert!(!config.has_email_config());

        config.email.recipients = vec!["team@example.com".to_string()];
        assert!(config.has_email_config());

        config.slack.webhook_url = Some("  ".to_string());
        assert!(!config.has_slack_config());
    }

    #[test]
    fn test_normalize_project_keys() {
        let keys = vec![
            " devops".to_string(),
            "EIT".to_string(),
            "".to_string(),
            "DevOps".to_string(),
        ];
        assert_eq!(normalize_project_keys(&keys), vec!["DEVOPS", "EIT"]);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.starts_with("# jira-digest configuration"));
        assert!(toml_str.contains("[jira]"));
        assert!(toml_str.contains("[aggregation]"));
        assert!(toml_str.contains("[schedule]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.aggregation, AggregationConfig::default());
    }
}
