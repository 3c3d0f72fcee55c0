//! Jira REST entity type definitions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response of `POST /rest/api/2/search`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    #[serde(default)]
    pub start_at: u64,
    #[serde(default)]
    pub max_results: u64,
    /// Number of issues matching the query, regardless of page size.
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub issues: Vec<Issue>,
}

/// Jira issue as returned by search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    /// Issue key (e.g., "ECMDEV-42")
    pub key: String,
    #[serde(default)]
    pub fields: IssueFields,
}

/// Issue fields used by the reports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueFields {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub status: Option<Status>,
    #[serde(default)]
    pub issuetype: Option<IssueType>,
    #[serde(default)]
    pub assignee: Option<User>,
    #[serde(default)]
    pub components: Option<Vec<Component>>,
    #[serde(default)]
    pub issuelinks: Option<Vec<IssueLink>>,
    /// Original estimate in seconds
    #[serde(default)]
    pub timeoriginalestimate: Option<i64>,
    /// Remaining estimate in seconds
    #[serde(default)]
    pub timeestimate: Option<i64>,
    /// Everything else, including `customfield_*` values
    #[serde(flatten)]
    pub custom: Map<String, Value>,
}

impl IssueFields {
    pub fn custom_field(&self, id: &str) -> Option<&Value> {
        self.custom.get(id).filter(|v| !v.is_null())
    }

    pub fn components(&self) -> &[Component] {
        self.components.as_deref().unwrap_or_default()
    }

    pub fn links(&self) -> &[IssueLink] {
        self.issuelinks.as_deref().unwrap_or_default()
    }

    pub fn status_name(&self) -> &str {
        self.status.as_ref().map_or("", |s| s.name.as_str())
    }

    pub fn issue_type_id(&self) -> &str {
        self.issuetype.as_ref().map_or("", |t| t.id.as_str())
    }

    pub fn issue_type_name(&self) -> &str {
        self.issuetype.as_ref().map_or("", |t| t.name.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Status {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueType {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Jira user. Server deployments identify users by `name`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
}

/// Link between two issues.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueLink {
    #[serde(rename = "type")]
    pub link_type: LinkType,
    #[serde(default)]
    pub inward_issue: Option<LinkedIssue>,
    #[serde(default)]
    pub outward_issue: Option<LinkedIssue>,
}

/// Link type with its inward and outward verbs (e.g., "is caused by" / "causes").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkType {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub inward: String,
    #[serde(default)]
    pub outward: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkedIssue {
    pub key: String,
}

/// Response of `GET /rest/api/2/issue/{key}/worklog`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorklogResponse {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub worklogs: Vec<Worklog>,
}

/// One worklog entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Worklog {
    #[serde(default)]
    pub author: User,
    /// When the work was logged, in Jira's timestamp format
    #[serde(default)]
    pub started: String,
    #[serde(default)]
    pub time_spent_seconds: i64,
}
