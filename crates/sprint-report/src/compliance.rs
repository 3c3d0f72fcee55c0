//! Compliance checks on a single issue.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use crate::models::Issue;
use crate::sprint::Sprint;

static SPRINT_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?P<y>\d{4})-(?P<m>\d{1,2})-(?P<d>\d{1,2})").unwrap());

/// The three compliance flags of an issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceFlags {
    pub has_curator: bool,
    pub has_components: bool,
    pub has_estimate: bool,
}

impl ComplianceFlags {
    /// Flags that satisfy every check.
    pub const COMPLIANT: Self = Self {
        has_curator: true,
        has_components: true,
        has_estimate: true,
    };

    pub fn evaluate(issue: &Issue, curator_field: &str) -> Self {
        Self {
            has_curator: has_curator(issue, curator_field),
            has_components: has_components(issue),
            has_estimate: has_estimate(issue),
        }
    }

    /// Logical AND of each flag.
    #[must_use]
    pub fn and(self, other: Self) -> Self {
        Self {
            has_curator: self.has_curator && other.has_curator,
            has_components: self.has_components && other.has_components,
            has_estimate: self.has_estimate && other.has_estimate,
        }
    }
}

/// Curator field is set to a user object with a non-empty name.
pub fn has_curator(issue: &Issue, curator_field: &str) -> bool {
    issue
        .fields
        .custom_field(curator_field)
        .and_then(|value| value.as_object())
        .and_then(|object| object.get("name"))
        .and_then(|name| name.as_str())
        .is_some_and(|name| !name.is_empty())
}

pub fn has_components(issue: &Issue) -> bool {
    !issue.fields.components().is_empty()
}

pub fn has_estimate(issue: &Issue) -> bool {
    issue.fields.timeoriginalestimate.is_some_and(|seconds| seconds > 0)
}

/// Matcher for "is this issue in the requested sprint".
///
/// Sprint names embed their start date (`YYYY-M-D`). The date is extracted
/// once per check run and looked up in each issue's most recent sprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SprintDate {
    needle: String,
}

impl SprintDate {
    /// Extract the date from a requested sprint name.
    ///
    /// Without a date the whole trimmed name is used.
    pub fn from_sprint_name(sprint_name: &str) -> Self {
        let needle = SPRINT_DATE
            .captures(sprint_name)
            .map(|caps| format!("{}-{}-{}", &caps["y"], &caps["m"], &caps["d"]))
            .unwrap_or_else(|| sprint_name.trim().to_string());
        Self { needle }
    }

    pub fn as_str(&self) -> &str {
        &self.needle
    }

    /// Whether the last of an issue's sprints is the requested one.
    ///
    /// Issues without sprints are never in the requested sprint.
    pub fn matches(&self, sprints: &[Sprint]) -> bool {
        sprints
            .last()
            .is_some_and(|sprint| sprint.name.contains(&self.needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::Roster;
    use serde_json::json;

    const CURATOR: &str = "customfield_10645";

    fn issue(fields: serde_json::Value) -> Issue {
        serde_json::from_value(json!({"key": "ECMDEV-1", "fields": fields})).unwrap()
    }

    fn sprint(name: &str) -> Sprint {
        Sprint::from_parts(1, name, "ACTIVE", "2024-03-01", "2024-03-14", &Roster::default())
            .unwrap()
    }

    #[test]
    fn test_defaults_are_not_compliant() {
        let issue = issue(json!({}));
        let flags = ComplianceFlags::evaluate(&issue, CURATOR);
        assert!(!flags.has_curator);
        assert!(!flags.has_components);
        assert!(!flags.has_estimate);
    }

    #[test]
    fn test_compliant_issue() {
        let issue = issue(json!({
            "components": [{"name": "api"}],
            "timeoriginalestimate": 3600,
            "customfield_10645": {"name": "carol"}
        }));
        assert_eq!(
            ComplianceFlags::evaluate(&issue, CURATOR),
            ComplianceFlags::COMPLIANT
        );
    }

    #[test]
    fn test_curator_must_be_named_object() {
        assert!(!has_curator(&issue(json!({"customfield_10645": "carol"})), CURATOR));
        assert!(!has_curator(&issue(json!({"customfield_10645": {"name": ""}})), CURATOR));
        assert!(!has_curator(&issue(json!({"customfield_10645": null})), CURATOR));
    }

    #[test]
    fn test_zero_estimate_is_missing() {
        assert!(!has_estimate(&issue(json!({"timeoriginalestimate": 0}))));
        assert!(!has_components(&issue(json!({"components": []}))));
    }

    #[test]
    fn test_flags_and() {
        let partial = ComplianceFlags {
            has_curator: false,
            has_components: true,
            has_estimate: true,
        };
        assert_eq!(ComplianceFlags::COMPLIANT.and(partial), partial);
    }

    #[test]
    fn test_sprint_date_extraction() {
        assert_eq!(
            SprintDate::from_sprint_name("2024-3-1 Sprint Alice").as_str(),
            "2024-3-1"
        );
        assert_eq!(
            SprintDate::from_sprint_name(" Team Alice ").as_str(),
            "Team Alice"
        );
    }

    #[test]
    fn test_sprint_date_matches_last_sprint_only() {
        let date = SprintDate::from_sprint_name("2024-03-01 Sprint Alice");
        let history = vec![sprint("2024-03-01 Sprint Alice"), sprint("2024-03-15 Sprint Alice")];
        assert!(!date.matches(&history));
        assert!(date.matches(&history[..1]));
        assert!(!date.matches(&[]));
    }
}
