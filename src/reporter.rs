//! Per-project fetch and aggregation.
//!
//! The reporter asks an [`IssueSource`] for each project's issues, runs the
//! aggregator and gathers the results into one [`DailyDigest`]. A project
//! that cannot be fetched or aggregated is recorded as a failure and the
//! remaining projects are still reported.

use async_trait::async_trait;
use chrono::{DateTime, Local, Utc};
use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use tracing::{debug, error, info, warn};

use crate::analysis::{aggregate, AggregationConfig};
use crate::config::ReportConfig;
use crate::models::{DailyDigest, IssueRecord, ProjectFailure, ReportDigest};

/// Something that can list a project's issues.
#[async_trait]
pub trait IssueSource: Send + Sync {
    /// Every issue of `project_key`, in any order.
    async fn fetch_issues(&self, project_key: &str) -> anyhow::Result<Vec<IssueRecord>>;

    /// Keys of the projects visible to the caller.
    async fn list_projects(&self) -> anyhow::Result<Vec<String>>;
}

/// Builds daily digests from an issue source.
pub struct DailyReporter<'a, S: IssueSource> {
    source: &'a S,
    report: &'a ReportConfig,
    aggregation: &'a AggregationConfig,
    progress: Option<ProgressBar>,
}

impl<'a, S: IssueSource> DailyReporter<'a, S> {
    pub fn new(source: &'a S, report: &'a ReportConfig, aggregation: &'a AggregationConfig) -> Self {
        Self {
            source,
            report,
            aggregation,
            progress: None,
        }
    }

    /// Tick `progress` once per finished project.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// The configured projects, or the first few the tracker reports.
    pub async fn resolve_projects(&self) -> anyhow::Result<Vec<String>> {
        if !self.report.projects.is_empty() {
            return Ok(self.report.projects.clone());
        }

        let mut discovered = self.source.list_projects().await?;
        discovered.truncate(self.report.discover_limit);
        warn!(
            "No projects configured, reporting on the first {} found: {}",
            discovered.len(),
            discovered.join(", ")
        );
        Ok(discovered)
    }

    /// Fetch and aggregate every project. Results keep the order of `projects`.
    pub async fn build_digest(&self, projects: &[String], now: DateTime<Utc>) -> DailyDigest {
        if let Some(ref pb) = self.progress {
            pb.set_length(projects.len() as u64);
        }

        let outcomes: Vec<Result<ReportDigest, ProjectFailure>> = stream::iter(projects)
            .map(|key| async move {
                let outcome = self.report_project(key, now).await;
                if let Some(ref pb) = self.progress {
                    pb.set_message(key.clone());
                    pb.inc(1);
                }
                outcome
            })
            .buffered(self.report.concurrency.max(1))
            .collect()
            .await;

        let mut digest = DailyDigest {
            date: now.with_timezone(&Local).format("%Y-%m-%d").to_string(),
            generated_at: now,
            projects: Vec::new(),
            failures: Vec::new(),
        };

        for outcome in outcomes {
            match outcome {
                Ok(report) => digest.projects.push(report),
                Err(failure) => digest.failures.push(failure),
            }
        }

        info!(
            "Digest built: {} project(s) reported, {} failed",
            digest.projects.len(),
            digest.failures.len()
        );
        digest
    }

    async fn report_project(
        &self,
        project_key: &str,
        now: DateTime<Utc>,
    ) -> Result<ReportDigest, ProjectFailure> {
        let fail = |error: String| {
            error!("Project {}: {}", project_key, error);
            ProjectFailure {
                project_key: project_key.to_string(),
                error,
            }
        };

        let records = self
            .source
            .fetch_issues(project_key)
            .await
            .map_err(|e| fail(format!("failed to fetch issues: {:#}", e)))?;
        debug!("Project {}: fetched {} issues", project_key, records.len());

        aggregate(&records, project_key, now, self.aggregation).map_err(|e| fail(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeSource {
        issues: HashMap<String, Vec<IssueRecord>>,
        projects: Vec<String>,
    }

    #[async_trait]
    impl IssueSource for FakeSource {
        async fn fetch_issues(&self, project_key: &str) -> anyhow::Result<Vec<IssueRecord>> {
            self.issues
                .get(project_key)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("project {} does not exist", project_key))
        }

        async fn list_projects(&self) -> anyhow::Result<Vec<String>> {
            Ok(self.projects.clone())
        }
    }

    fn record(key: &str, status: &str) -> IssueRecord {
        IssueRecord {
            key: Some(key.to_string()),
            summary: Some(format!("Work on {key}")),
            status: Some(status.to_string()),
            created: Some("2024-05-01T08:00:00Z".to_string()),
            ..Default::default()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn keys(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_failed_project_does_not_stop_the_others() {
        let mut source = FakeSource::default();
        source
            .issues
            .insert("DEVOPS".to_string(), vec![record("DEVOPS-1", "Blocked")]);
        source
            .issues
            .insert("EIT".to_string(), vec![record("EIT-1", "To Do"), record("EIT-2", "Done")]);

        let report = ReportConfig::default();
        let aggregation = AggregationConfig::default();
        let reporter = DailyReporter::new(&source, &report, &aggregation);

        let digest = reporter
            .build_digest(&keys(&["DEVOPS", "MISSING", "EIT"]), now())
            .await;

        let reported: Vec<_> = digest.projects.iter().map(|p| p.project_key.as_str()).collect();
        assert_eq!(reported, vec!["DEVOPS", "EIT"]);
        assert_eq!(digest.projects[0].blocked_issues.len(), 1);
        assert_eq!(digest.projects[1].total_issues, 2);

        assert_eq!(digest.failures.len(), 1);
        assert_eq!(digest.failures[0].project_key, "MISSING");
        assert!(digest.failures[0].error.contains("does not exist"));
        assert_eq!(digest.generated_at, now());
    }

    #[tokio::test]
    async fn test_invalid_record_fails_only_its_project() {
        let mut source = FakeSource::default();
        let mut broken = record("BAD-1", "To Do");
        broken.created = Some("yesterday".to_string());
        source.issues.insert("BAD".to_string(), vec![broken]);
        source
            .issues
            .insert("OK".to_string(), vec![record("OK-1", "In Progress")]);

        let report = ReportConfig::default();
        let aggregation = AggregationConfig::default();
        let reporter = DailyReporter::new(&source, &report, &aggregation);

        let digest = reporter.build_digest(&keys(&["BAD", "OK"]), now()).await;

        assert_eq!(digest.projects.len(), 1);
        assert_eq!(digest.projects[0].project_key, "OK");
        assert_eq!(digest.failures[0].project_key, "BAD");
        assert!(digest.failures[0].error.contains("BAD-1"));
    }

    #[tokio::test]
    async fn test_order_is_kept_with_concurrency() {
        let mut source = FakeSource::default();
        for key in ["A", "B", "C", "D", "E"] {
            source.issues.insert(key.to_string(), vec![record(&format!("{key}-1"), "To Do")]);
        }

        let report = ReportConfig {
            concurrency: 3,
            ..Default::default()
        };
        let aggregation = AggregationConfig::default();
        let reporter = DailyReporter::new(&source, &report, &aggregation);

        let digest = reporter
            .build_digest(&keys(&["E", "C", "A", "D", "B"]), now())
            .await;
        let reported: Vec<_> = digest.projects.iter().map(|p| p.project_key.as_str()).collect();
        assert_eq!(reported, vec!["E", "C", "A", "D", "B"]);
    }

    #[tokio::test]
    async fn test_configured_projects_win_over_discovery() {
        let source = FakeSource {
            projects: keys(&["X", "Y"]),
            ..Default::default()
        };
        let report = ReportConfig {
            projects: keys(&["DEVOPS"]),
            ..Default::default()
        };
        let aggregation = AggregationConfig::default();
        let reporter = DailyReporter::new(&source, &report, &aggregation);

        assert_eq!(reporter.resolve_projects().await.unwrap(), vec!["DEVOPS"]);
    }

    #[tokio::test]
    async fn test_discovery_is_limited() {
        let source = FakeSource {
            projects: keys(&["P1", "P2", "P3", "P4", "P5", "P6", "P7"]),
            ..Default::default()
        };
        let report = ReportConfig::default();
        let aggregation = AggregationConfig::default();
        let reporter = DailyReporter::new(&source, &report, &aggregation);

        let projects = reporter.resolve_projects().await.unwrap();
        assert_eq!(projects, keys(&["P1", "P2", "P3", "P4", "P5"]));
    }
}
