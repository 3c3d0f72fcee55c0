//! Shared fixtures and an in-memory tracker for unit tests.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use crate::client::IssueTracker;
use crate::config::TrackerSettings;
use crate::error::TrackerError;
use crate::models::{Issue, Worklog};
use crate::roster::{Developer, Roster};

pub const SPRINT_FIELD: &str = "customfield_10001";

pub fn settings() -> TrackerSettings {
    TrackerSettings {
        project: "ECMDEV".to_string(),
        bus_project: "ECMBUS".to_string(),
        curator_field: "customfield_10645".to_string(),
        sprint_field: SPRINT_FIELD.to_string(),
        return_issue_type: "10602".to_string(),
        finished_statuses: vec!["DEPLOY".to_string(), "FINISHED".to_string()],
        max_results: 1000,
        zero_causes_compliant: false,
    }
}

/// Two teams: alice leads bob, dave leads carol.
pub fn roster() -> Roster {
    let dev = |code: &str, name: &str, lead: &str| {
        (
            code.to_string(),
            Developer {
                name: name.to_string(),
                lead: lead.to_string(),
            },
        )
    };
    Roster::new([
        dev("alice", "Alice", "alice"),
        dev("bob", "Bob", "alice"),
        dev("carol", "Carol", "dave"),
        dev("dave", "Dave", "dave"),
    ])
}

/// Serialized sprint descriptor as Jira Server returns it.
pub fn descriptor(id: u64, state: &str, name: &str, start: &str, end: &str) -> String {
    format!(
        "com.atlassian.greenhopper.service.sprint.Sprint@{id:x}[id={id},rapidViewId=1,state={state},name={name},startDate={start}T09:00:00.000+03:00,endDate={end}T18:00:00.000+03:00,completeDate=<null>,sequence={id}]"
    )
}

pub fn issue(key: &str, fields: Value) -> Issue {
    serde_json::from_value(json!({"key": key, "fields": fields})).unwrap()
}

pub fn issue_in_sprints(key: &str, sprints: &[&str]) -> Issue {
    issue(key, json!({ SPRINT_FIELD: sprints, "summary": format!("Issue {key}") }))
}

pub fn worklog(author: &str, started: &str, seconds: i64) -> Worklog {
    serde_json::from_value(json!({
        "author": {"name": author},
        "started": started,
        "timeSpentSeconds": seconds
    }))
    .unwrap()
}

/// Tracker answering the three report searches from memory.
#[derive(Default)]
pub struct StaticTracker {
    by_key: BTreeMap<String, Issue>,
    open_sprints: Vec<Issue>,
    worklog_issues: Vec<Issue>,
    worklogs: HashMap<String, Vec<Worklog>>,
    failure: Option<String>,
    queries: Mutex<Vec<String>>,
}

impl StaticTracker {
    pub fn with_issues(mut self, issues: Vec<Issue>) -> Self {
        for issue in issues {
            self.by_key.insert(issue.key.clone(), issue);
        }
        self
    }

    pub fn with_open_sprints(mut self, issues: Vec<Issue>) -> Self {
        self.open_sprints = issues;
        self
    }

    pub fn with_worklog_issues(mut self, issues: Vec<Issue>) -> Self {
        self.worklog_issues = issues;
        self
    }

    pub fn with_worklogs(mut self, key: &str, worklogs: Vec<Worklog>) -> Self {
        self.worklogs.insert(key.to_string(), worklogs);
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    /// Every JQL query received so far.
    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    fn requested_keys(jql: &str) -> Vec<String> {
        let Some(start) = jql.find("key in (") else {
            return Vec::new();
        };
        let list = &jql[start + "key in (".len()..];
        let list = list.split(')').next().unwrap_or_default();
        list.split(',')
            .map(|k| k.trim().trim_matches('\'').to_string())
            .collect()
    }
}

#[async_trait]
impl IssueTracker for StaticTracker {
    async fn search(&self, jql: &str, _max_results: u32) -> Result<Vec<Issue>, TrackerError> {
        self.queries.lock().unwrap().push(jql.to_string());
        if let Some(message) = &self.failure {
            return Err(TrackerError::Api {
                status: 500,
                message: message.clone(),
            });
        }

        if jql.contains("openSprints()") {
            return Ok(self.open_sprints.clone());
        }
        if jql.contains("worklogDate") {
            return Ok(self.worklog_issues.clone());
        }
        Ok(Self::requested_keys(jql)
            .iter()
            .filter_map(|key| self.by_key.get(key).cloned())
            .collect())
    }

    async fn worklogs(&self, issue_key: &str) -> Result<Vec<Worklog>, TrackerError> {
        Ok(self.worklogs.get(issue_key).cloned().unwrap_or_default())
    }
}
