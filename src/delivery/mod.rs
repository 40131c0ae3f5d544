//! Digest delivery by email and Slack.
//!
//! Each channel is attempted independently; the [`DeliverySummary`] records
//! what happened on each one.

pub mod email;
pub mod slack;

pub use email::EmailSender;
pub use slack::SlackNotifier;

use crate::config::{Config, SlackConfig};
use crate::models::DailyDigest;
use crate::report::{build_slack_blocks, build_slack_text, format_digest_as_html, format_digest_as_text};
use anyhow::Result;
use std::fmt;
use tracing::{error, info};

/// Result of one delivery channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelOutcome {
    NotConfigured,
    Sent,
    Failed(String),
}

impl fmt::Display for ChannelOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelOutcome::NotConfigured => write!(f, "not configured"),
            ChannelOutcome::Sent => write!(f, "sent"),
            ChannelOutcome::Failed(reason) => write!(f, "failed ({})", reason),
        }
    }
}

/// Per-channel outcome of one dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliverySummary {
    pub email: ChannelOutcome,
    pub slack: ChannelOutcome,
}

impl DeliverySummary {
    fn outcomes(&self) -> [&ChannelOutcome; 2] {
        [&self.email, &self.slack]
    }

    /// At least one channel was configured and none of them succeeded.
    pub fn all_failed(&self) -> bool {
        let configured: Vec<_> = self
            .outcomes()
            .into_iter()
            .filter(|o| **o != ChannelOutcome::NotConfigured)
            .collect();
        !configured.is_empty() && configured.iter().all(|o| matches!(o, ChannelOutcome::Failed(_)))
    }

    pub fn nothing_configured(&self) -> bool {
        self.outcomes()
            .iter()
            .all(|o| **o == ChannelOutcome::NotConfigured)
    }
}

/// Sends a digest to every configured channel.
pub struct Dispatcher {
    email: Option<EmailSender>,
    slack: Option<SlackNotifier>,
    slack_config: SlackConfig,
}

impl Dispatcher {
    pub fn new(email: Option<EmailSender>, slack: Option<SlackNotifier>, slack_config: SlackConfig) -> Self {
        Self {
            email,
            slack,
            slack_config,
        }
    }

    /// Channels from the configuration, minus any the caller switched off.
    pub fn from_config(config: &Config, skip_email: bool, skip_slack: bool) -> Result<Self> {
        let email = if skip_email || !config.has_email_config() {
            None
        } else {
            EmailSender::from_config(&config.email)
        };

        let slack = match config.slack.webhook_url.as_deref() {
            Some(url) if !skip_slack && config.has_slack_config() => Some(SlackNotifier::new(url)?),
            _ => None,
        };

        Ok(Self::new(email, slack, config.slack.clone()))
    }

    pub async fn dispatch(&self, digest: &DailyDigest) -> DeliverySummary {
        let email = match self.email {
            Some(ref sender) => {
                let text = format_digest_as_text(digest);
                let html = format_digest_as_html(digest);
                match sender.send(&digest.date, text, html).await {
                    Ok(()) => ChannelOutcome::Sent,
                    Err(e) => {
                        error!("Email delivery failed: {}", e);
                        ChannelOutcome::Failed(e.to_string())
                    }
                }
            }
            None => ChannelOutcome::NotConfigured,
        };

        let slack = match self.slack {
            Some(ref notifier) => {
                let payload = if self.slack_config.simple {
                    build_slack_text(digest, &self.slack_config)
                } else {
                    build_slack_blocks(digest, &self.slack_config)
                };
                match notifier.send(&payload).await {
                    Ok(()) => ChannelOutcome::Sent,
                    Err(e) => {
                        error!("Slack delivery failed: {}", e);
                        ChannelOutcome::Failed(e.to_string())
                    }
                }
            }
            None => ChannelOutcome::NotConfigured,
        };

        let summary = DeliverySummary { email, slack };
        info!("Delivery: email {}, slack {}", summary.email, summary.slack);
        summary
    }
}
