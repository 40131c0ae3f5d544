//! Jira REST client.
//!
//! Retries transient failures with exponential backoff and follows search
//! pagination.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::models::{JiraIssue, JiraProject, SearchResponse};
use super::query;
use crate::config::JiraConfig;
use crate::error::JiraError;
use crate::models::IssueRecord;
use crate::reporter::IssueSource;

const SEARCH_PATH: &str = "/rest/api/2/search";
const PROJECT_PATH: &str = "/rest/api/2/project";
const ISSUE_FIELDS: &str = "summary,status,assignee,priority,created,duedate,project";

/// Jira REST client with retry and pagination.
#[derive(Clone)]
pub struct JiraClient {
    client: Client,
    config: JiraConfig,
}

impl JiraClient {
    pub fn new(config: JiraConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self { client, config })
    }

    /// Point the client at a mock server.
    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.server = base_url.to_string();
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.server.trim_end_matches('/'), path)
    }

    /// Run a JQL search, following pages until every match is collected.
    pub async fn search_issues(&self, jql: &str) -> Result<Vec<JiraIssue>, JiraError> {
        let page_size = self.config.page_size.max(1);
        let url = self.url(SEARCH_PATH);
        let mut start_at = 0usize;
        let mut issues = Vec::new();

        loop {
            let params = [
                ("jql", jql.to_string()),
                ("startAt", start_at.to_string()),
                ("maxResults", page_size.to_string()),
                ("fields", ISSUE_FIELDS.to_string()),
            ];
            let page: SearchResponse = self.request_with_retry(&url, &params).await?;
            let page_len = page.issues.len();
            debug!(jql, start_at, page_len, total = ?page.total, "fetched search page");

            issues.extend(page.issues);
            start_at += page_len;

            let done = match page.total {
                Some(total) => page_len == 0 || start_at >= total,
                None => page_len < page_size,
            };
            if done {
                break;
            }
        }

        Ok(issues)
    }

    /// List the projects visible to the configured account.
    pub async fn fetch_projects(&self) -> Result<Vec<JiraProject>, JiraError> {
        self.request_with_retry(&self.url(PROJECT_PATH), &[]).await
    }

    async fn request_with_retry<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T, JiraError> {
        let mut last_error = String::new();
        let mut rate_limit_waited = false;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 && !rate_limit_waited {
                let backoff_secs = std::cmp::min(1u64 << attempt, 30);
                warn!(attempt, backoff_secs, "retrying Jira request after backoff");
                tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
            }
            rate_limit_waited = false;

            let response = match self
                .client
                .get(url)
                .query(params)
                .basic_auth(&self.config.email, Some(&self.config.api_token))
                .header("Accept", "application/json")
                .send()
                .await
            {
                Ok(resp) => resp,
                Err(e) => {
                    last_error = e.to_string();
                    if e.is_timeout() || e.is_connect() {
                        continue;
                    }
                    return Err(JiraError::Request(e));
                }
            };

            let status = response.status();

            if status.is_success() {
                return response.json::<T>().await.map_err(JiraError::Request);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                last_error = "429 Too Many Requests".to_string();
                if attempt < self.config.max_retries {
                    if let Some(wait) = retry_after(response.headers()) {
                        warn!(wait_secs = wait.as_secs(), "rate-limited by Jira, waiting Retry-After");
                        tokio::time::sleep(wait).await;
                        rate_limit_waited = true;
                    }
                }
                continue;
            }

            if status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                last_error = format!("{status}: {body}");
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            return Err(JiraError::Http { status, body });
        }

        Err(JiraError::MaxRetriesExceeded {
            attempts: self.config.max_retries + 1,
            last_error,
        })
    }
}

/// The `Retry-After` delay in whole seconds, capped at 60.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(|secs| Duration::from_secs(secs.min(60)))
}

#[async_trait]
impl IssueSource for JiraClient {
    async fn fetch_issues(&self, project_key: &str) -> anyhow::Result<Vec<IssueRecord>> {
        let jql = query::project_issues_jql(project_key);
        let issues = self.search_issues(&jql).await?;
        Ok(issues.iter().map(IssueRecord::from).collect())
    }

    async fn list_projects(&self) -> anyhow::Result<Vec<String>> {
        let projects = self.fetch_projects().await?;
        Ok(projects.into_iter().map(|p| p.key).collect())
    }
}
