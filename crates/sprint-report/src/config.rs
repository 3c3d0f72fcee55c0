//! Configuration for the sprint report service.

use std::env;
use std::path::PathBuf;

/// Terminal statuses counted as finished when none are configured.
const DEFAULT_FINISHED_STATUSES: &[&str] = &[
    "Реализовано",
    "FINISHED",
    "WF DEPLOY",
    "DEPLOY",
    "Declined",
    "To release",
    "On regress",
    "YT",
];

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port.
    pub port: u16,
    /// Route prefix the sprint endpoints are mounted under.
    pub prefix: String,
    /// Shared secret every sprint request must carry as `hash`.
    pub hash: Option<String>,
    /// Roster as inline JSON.
    pub developers: Option<String>,
    /// Roster JSON file, used when no inline roster is set.
    pub developers_file: Option<PathBuf>,
    /// Jira connection.
    pub jira: JiraConfig,
    /// Jira field and project conventions.
    pub tracker: TrackerSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: env::var("SPRINT_REPORT_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8080),
            prefix: env::var("SPRINT_REPORT_PREFIX")
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "kd".to_string()),
            hash: env::var("SPRINT_REPORT_HASH")
                .ok()
                .filter(|s| !s.is_empty()),
            developers: env::var("SPRINT_REPORT_DEVELOPERS")
                .ok()
                .filter(|s| !s.is_empty()),
            developers_file: env::var("SPRINT_REPORT_DEVELOPERS_FILE")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            jira: JiraConfig::default(),
            tracker: TrackerSettings::default(),
        }
    }
}

/// Jira connection settings.
#[derive(Clone)]
pub struct JiraConfig {
    /// Base URL, e.g. `https://jira.example.com`.
    pub url: Option<String>,
    /// Login for basic auth. Bearer auth is used when unset.
    pub user: Option<String>,
    /// API token or password.
    pub token: Option<String>,
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            url: env::var("JIRA_URL").ok().filter(|s| !s.is_empty()),
            user: env::var("JIRA_USER").ok().filter(|s| !s.is_empty()),
            token: env::var("JIRA_TOKEN").ok().filter(|s| !s.is_empty()),
        }
    }
}

impl std::fmt::Debug for JiraConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("token", &self.token.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Organization conventions for projects, custom fields and statuses.
#[derive(Debug, Clone)]
pub struct TrackerSettings {
    /// Project every search is restricted to.
    pub project: String,
    /// Project whose issue keys are reported as the Bus key.
    pub bus_project: String,
    /// Custom field holding the curator user.
    pub curator_field: String,
    /// Custom field holding the serialized sprints.
    pub sprint_field: String,
    /// Issue type id of "return" issues, which never carry an estimate.
    pub return_issue_type: String,
    /// Status names that count as finished.
    pub finished_statuses: Vec<String>,
    /// Page size of the single search request.
    pub max_results: u32,
    /// Whether issues without causes become compliant during cause propagation.
    pub zero_causes_compliant: bool,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            project: env::var("JIRA_PROJECT").unwrap_or_else(|_| "ECMDEV".to_string()),
            bus_project: env::var("JIRA_BUS_PROJECT").unwrap_or_else(|_| "ECMBUS".to_string()),
            curator_field: env::var("JIRA_CURATOR_FIELD")
                .unwrap_or_else(|_| "customfield_10645".to_string()),
            sprint_field: env::var("JIRA_SPRINT_FIELD")
                .unwrap_or_else(|_| "customfield_10001".to_string()),
            return_issue_type: env::var("JIRA_RETURN_ISSUE_TYPE")
                .unwrap_or_else(|_| "10602".to_string()),
            finished_statuses: env::var("JIRA_FINISHED_STATUSES")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(|s| s.split(',').map(|v| v.trim().to_string()).collect())
                .unwrap_or_else(|| {
                    DEFAULT_FINISHED_STATUSES
                        .iter()
                        .map(ToString::to_string)
                        .collect()
                }),
            max_results: env::var("JIRA_MAX_RESULTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),
            zero_causes_compliant: env::var("SPRINT_REPORT_ZERO_CAUSES_COMPLIANT")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
        }
    }
}

impl TrackerSettings {
    /// Check whether a status name is terminal.
    pub fn is_finished(&self, status: &str) -> bool {
        self.finished_statuses.iter().any(|s| s == status)
    }
}
