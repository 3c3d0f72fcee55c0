//! Sprint custom-field parsing.
//!
//! Jira Server stores sprints on an issue as serialized descriptors such as
//!
//! ```text
//! com.atlassian.greenhopper.service.sprint.Sprint@1f2e[id=42,rapidViewId=7,
//! state=ACTIVE,name=2024-03-01 Sprint Alice,startDate=2024-03-01T09:00:00.000+03:00,
//! endDate=2024-03-14T18:00:00.000+03:00,completeDate=<null>,sequence=42]
//! ```
//!
//! Parsing is best-effort: descriptors that do not match, or whose dates
//! cannot be read, are dropped without failing the rest of the field.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

use crate::issue::IssueRecord;
use crate::models::Issue;
use crate::roster::Roster;

static DESCRIPTOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"id=(?P<id>\d+?),(.*?)state=(?P<state>.+?),(.*?)name=(?P<name>.+?),(.*?)startDate=(?P<start>.+?),endDate=(?P<finish>.+?),",
    )
    .unwrap()
});

/// Why a single sprint descriptor was dropped.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SprintParseError {
    #[error("descriptor does not match the sprint pattern")]
    Malformed,
    #[error("invalid sprint id: {0}")]
    InvalidId(String),
    #[error("unparsable date: {0}")]
    InvalidDate(String),
}

/// Which end of the day a date is normalized to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayBoundary {
    /// 00:00
    Start,
    /// 23:59
    End,
}

/// A sprint as parsed from an issue.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sprint {
    pub id: u64,
    pub name: String,
    /// Whether the sprint state is `ACTIVE`
    pub active: bool,
    /// Code of the lead owning the sprint, empty when unknown
    pub lead: String,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub sprint_interval: String,
    /// Issue roster, filled by the active sprint collector
    pub issues: BTreeMap<String, IssueRecord>,
}

impl Sprint {
    /// Build a sprint from its raw parts, normalizing the dates.
    pub fn from_parts(
        id: u64,
        name: &str,
        state: &str,
        start: &str,
        end: &str,
        roster: &Roster,
    ) -> Result<Self, SprintParseError> {
        let start_date = convert_date(start, DayBoundary::Start)
            .ok_or_else(|| SprintParseError::InvalidDate(start.to_string()))?;
        let end_date = convert_date(end, DayBoundary::End)
            .ok_or_else(|| SprintParseError::InvalidDate(end.to_string()))?;

        Ok(Self {
            id,
            name: name.to_string(),
            active: state == "ACTIVE",
            lead: roster.sprint_lead(name),
            sprint_interval: format!(
                "{} - {}",
                start_date.format("%d.%m.%Y 0:00"),
                end_date.format("%d.%m.%Y 23:59")
            ),
            start_date,
            end_date,
            issues: BTreeMap::new(),
        })
    }

    /// Whether `at` falls in `[start_date, end_date)`.
    pub fn covers(&self, at: NaiveDateTime) -> bool {
        at >= self.start_date && at < self.end_date
    }
}

/// Parse one serialized sprint descriptor.
pub fn parse_descriptor(raw: &str, roster: &Roster) -> Result<Sprint, SprintParseError> {
    let caps = DESCRIPTOR
        .captures(raw)
        .ok_or(SprintParseError::Malformed)?;

    let id = caps["id"]
        .parse()
        .map_err(|_| SprintParseError::InvalidId(caps["id"].to_string()))?;

    Sprint::from_parts(
        id,
        &caps["name"],
        &caps["state"],
        &caps["start"],
        &caps["finish"],
        roster,
    )
}

/// Sprint field value as returned by newer Jira versions.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SprintObject {
    id: u64,
    name: String,
    #[serde(default)]
    state: String,
    #[serde(default)]
    start_date: Option<String>,
    #[serde(default)]
    end_date: Option<String>,
}

fn parse_object(value: &Value, roster: &Roster) -> Result<Sprint, SprintParseError> {
    let object =
        SprintObject::deserialize(value).map_err(|_| SprintParseError::Malformed)?;
    Sprint::from_parts(
        object.id,
        &object.name,
        &object.state.to_ascii_uppercase(),
        object.start_date.as_deref().unwrap_or_default(),
        object.end_date.as_deref().unwrap_or_default(),
        roster,
    )
}

/// Parse every sprint in a sprint custom-field value.
///
/// Returns sprints in order of appearance. A later descriptor with an id
/// already seen replaces the earlier one in place.
pub fn parse_sprint_field(value: &Value, roster: &Roster) -> Vec<Sprint> {
    let entries: Vec<&Value> = match value {
        Value::Array(items) => items.iter().collect(),
        Value::Null => Vec::new(),
        other => vec![other],
    };

    let mut sprints: Vec<Sprint> = Vec::new();
    for entry in entries {
        let parsed = match entry {
            Value::String(raw) => parse_descriptor(raw, roster),
            Value::Object(_) => parse_object(entry, roster),
            _ => Err(SprintParseError::Malformed),
        };

        match parsed {
            Ok(sprint) => match sprints.iter().position(|s| s.id == sprint.id) {
                Some(index) => sprints[index] = sprint,
                None => sprints.push(sprint),
            },
            Err(e) => debug!(error = %e, "Skipping sprint descriptor"),
        }
    }
    sprints
}

/// Parse the sprints of an issue from the configured sprint field.
pub fn issue_sprints(issue: &Issue, sprint_field: &str, roster: &Roster) -> Vec<Sprint> {
    issue
        .fields
        .custom_field(sprint_field)
        .map(|value| parse_sprint_field(value, roster))
        .unwrap_or_default()
}

/// The most recent sprint of an issue. Jira lists sprints oldest first.
pub fn current_sprint(issue: &Issue, sprint_field: &str, roster: &Roster) -> Option<Sprint> {
    issue_sprints(issue, sprint_field, roster).pop()
}

fn parse_day(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.date_naive());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt.date());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

/// Parse a tracker timestamp and normalize it to the start or end of its day.
///
/// The calendar day is taken in the timestamp's own offset. Returns `None`
/// for blank or unparsable input.
pub fn convert_date(raw: &str, boundary: DayBoundary) -> Option<NaiveDateTime> {
    let day = parse_day(raw)?;
    let time = match boundary {
        DayBoundary::Start => NaiveTime::MIN,
        DayBoundary::End => NaiveTime::from_hms_opt(23, 59, 0)?,
    };
    Some(day.and_time(time))
}
