//! Slack incoming webhook delivery.

use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tracing::info;

use crate::error::DeliveryError;

/// Posts payloads to a Slack incoming webhook.
#[derive(Debug, Clone)]
pub struct SlackNotifier {
    client: Client,
    webhook_url: String,
}

impl SlackNotifier {
    pub fn new(webhook_url: &str) -> Result<Self, DeliveryError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            webhook_url: webhook_url.trim().to_string(),
        })
    }

    pub async fn send(&self, payload: &Value) -> Result<(), DeliveryError> {
        let response = self.client.post(&self.webhook_url).json(payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Webhook { status, body });
        }

        info!("Slack message delivered");
        Ok(())
    }
}
