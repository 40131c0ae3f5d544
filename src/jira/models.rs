//! Jira REST response types.

use crate::models::IssueRecord;
use serde::{Deserialize, Serialize};

/// One page of `/rest/api/2/search`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    /// Absent on some deployments; paging then stops at the first short page.
    #[serde(default)]
    pub total: Option<usize>,
    #[serde(default)]
    pub issues: Vec<JiraIssue>,
}

/// An issue as returned by the search API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraIssue {
    pub key: Option<String>,
    #[serde(default)]
    pub fields: JiraIssueFields,
}

/// The subset of issue fields the digest needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JiraIssueFields {
    pub summary: Option<String>,
    pub status: Option<NamedRef>,
    pub assignee: Option<JiraUserRef>,
    pub priority: Option<NamedRef>,
    pub created: Option<String>,
    pub duedate: Option<String>,
    pub project: Option<ProjectRef>,
}

/// Status, priority and similar `{ "name": ... }` objects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamedRef {
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraUserRef {
    pub display_name: Option<String>,
    pub email_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRef {
    pub key: Option<String>,
}

/// A project from `/rest/api/2/project`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraProject {
    pub key: String,
    pub name: Option<String>,
}

impl From<&JiraIssue> for IssueRecord {
    fn from(issue: &JiraIssue) -> Self {
        let f = &issue.fields;
        IssueRecord {
            key: issue.key.clone(),
            summary: f.summary.clone(),
            status: f.status.as_ref().and_then(|s| s.name.clone()),
            assignee: f.assignee.as_ref().and_then(|a| {
                a.display_name.clone().or_else(|| a.email_address.clone())
            }),
            priority: f.priority.as_ref().and_then(|p| p.name.clone()),
            created: f.created.clone(),
            due_date: f.duedate.clone(),
            project_key: f.project.as_ref().and_then(|p| p.key.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_search_page() {
        let json = r#"{
            "startAt": 0,
            "maxResults": 50,
            "total": 1,
            "issues": [{
                "key": "DEVOPS-12",
                "fields": {
                    "summary": "Upgrade runners",
                    "status": {"name": "Blocked", "id": "10004"},
                    "assignee": {"displayName": "Ana Lima", "accountId": "abc"},
                    "priority": {"name": "High"},
                    "created": "2024-01-15T10:30:00.000+0000",
                    "duedate": null,
                    "project": {"key": "DEVOPS", "name": "DevOps"}
                }
            }]
        }"#;

        let page: SearchResponse = serde_json::from_str(json).expect("should deserialize");
        assert_eq!(page.total, Some(1));
        assert_eq!(page.issues.len(), 1);

        let record = IssueRecord::from(&page.issues[0]);
        assert_eq!(record.key.as_deref(), Some("DEVOPS-12"));
        assert_eq!(record.status.as_deref(), Some("Blocked"));
        assert_eq!(record.assignee.as_deref(), Some("Ana Lima"));
        assert_eq!(record.priority.as_deref(), Some("High"));
        assert_eq!(record.project_key.as_deref(), Some("DEVOPS"));
        assert!(record.due_date.is_none());
    }

    #[test]
    fn test_deserialize_minimal_issue() {
        let json = r#"{"key": "EIT-1", "fields": {"assignee": null}}"#;
        let issue: JiraIssue = serde_json::from_str(json).expect("should deserialize");
        let record = IssueRecord::from(&issue);
        assert_eq!(record.key.as_deref(), Some("EIT-1"));
        assert!(record.status.is_none());
        assert!(record.assignee.is_none());
        assert!(record.created.is_none());
    }
}
