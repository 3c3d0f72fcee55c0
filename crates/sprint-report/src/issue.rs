//! Per-issue report record.

use serde::Serialize;

use crate::config::TrackerSettings;
use crate::links::cause_keys;
use crate::models::Issue;
use crate::roster::Roster;

/// Issue as it appears in sprint rosters and worklog buckets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRecord {
    pub key: String,
    /// Original estimate in seconds, always zero for return issues
    pub original_estimate: i64,
    /// Seconds logged, accumulated by the worklog aggregator
    pub spent_time: i64,
    /// Assignee code, empty unless a known team member
    pub assignee: String,
    /// Curator name, empty when unset
    pub curator: String,
    pub is_finished: bool,
    /// Remaining estimate in seconds
    pub estimate: i64,
    pub is_return: bool,
    pub title: String,
    pub causes: Vec<String>,
    #[serde(rename = "type")]
    pub issue_type: String,
}

impl IssueRecord {
    pub fn from_issue(issue: &Issue, settings: &TrackerSettings, roster: &Roster) -> Self {
        let fields = &issue.fields;

        let assignee = fields
            .assignee
            .as_ref()
            .map(|user| user.name.as_str())
            .filter(|name| roster.contains(name))
            .unwrap_or_default()
            .to_string();

        let is_return = fields.issue_type_id() == settings.return_issue_type;
        let original_estimate = if is_return {
            0
        } else {
            fields.timeoriginalestimate.unwrap_or(0)
        };

        let curator = fields
            .custom_field(&settings.curator_field)
            .and_then(|value| value.get("name"))
            .and_then(|name| name.as_str())
            .unwrap_or_default()
            .to_string();

        Self {
            key: issue.key.clone(),
            original_estimate,
            spent_time: 0,
            assignee,
            curator,
            is_finished: settings.is_finished(fields.status_name()),
            estimate: fields.timeestimate.unwrap_or(0),
            is_return,
            title: fields.summary.clone().unwrap_or_default(),
            causes: cause_keys(fields.links()),
            issue_type: fields.issue_type_name().to_string(),
        }
    }
}
