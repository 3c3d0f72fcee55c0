//! Report operations behind the HTTP endpoints.

use chrono::{Local, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::active::{collect_active_sprints, ActiveSprints};
use crate::client::IssueTracker;
use crate::compliance::{ComplianceFlags, SprintDate};
use crate::config::TrackerSettings;
use crate::error::ReportError;
use crate::jql;
use crate::links::{propagate, scan_links, CauseIndex};
use crate::roster::Roster;
use crate::sprint::issue_sprints;
use crate::worklog::{aggregate_worklogs, SprintStats};

/// One row of the sprint check report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckRow {
    pub key: String,
    /// Status name, upper-cased
    pub status: String,
    /// Whether the issue's current sprint is the requested one
    pub in_sprint: bool,
    #[serde(flatten)]
    pub flags: ComplianceFlags,
    pub bus_key: String,
    pub causes: Vec<String>,
}

/// Check rows keyed by issue key.
pub type CheckReport = BTreeMap<String, CheckRow>;

/// Read-only sprint reports over the issue tracker.
///
/// Holds no per-request state: every call derives what it needs and passes
/// it down explicitly.
#[derive(Clone)]
pub struct ReportService {
    tracker: Arc<dyn IssueTracker>,
    settings: TrackerSettings,
    roster: Roster,
}

impl ReportService {
    pub fn new(tracker: Arc<dyn IssueTracker>, settings: TrackerSettings, roster: Roster) -> Self {
        Self {
            tracker,
            settings,
            roster,
        }
    }

    pub fn settings(&self) -> &TrackerSettings {
        &self.settings
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Compliance of the given tasks against the requested sprint.
    #[instrument(skip(self, tasks), fields(tasks = tasks.len()))]
    pub async fn check(
        &self,
        sprint_name: &str,
        tasks: &[String],
    ) -> Result<CheckReport, ReportError> {
        if sprint_name.trim().is_empty() {
            return Err(ReportError::EmptySprint);
        }

        let tasks: Vec<&str> = tasks
            .iter()
            .map(|task| task.trim())
            .filter(|task| !task.is_empty())
            .collect();
        if tasks.is_empty() {
            return Err(ReportError::EmptyTaskList);
        }

        let sprint_date = SprintDate::from_sprint_name(sprint_name);
        let settings = &self.settings;

        let query = jql::issues_by_key(&settings.project, &tasks);
        let issues = self.tracker.search(&query, settings.max_results).await?;

        let mut causes = CauseIndex::default();
        let mut report = CheckReport::new();
        for issue in &issues {
            let sprints = issue_sprints(issue, &settings.sprint_field, &self.roster);
            let links = scan_links(issue.fields.links(), &settings.bus_project);
            causes.record(&issue.key, &links.causes);

            report.insert(
                issue.key.clone(),
                CheckRow {
                    key: issue.key.clone(),
                    status: issue.fields.status_name().to_uppercase(),
                    in_sprint: sprint_date.matches(&sprints),
                    flags: ComplianceFlags::evaluate(issue, &settings.curator_field),
                    bus_key: links.bus_key,
                    causes: links.causes,
                },
            );
        }

        if !causes.is_empty() {
            let work_flags = causes.fetch_flags(self.tracker.as_ref(), settings).await?;
            for row in report.values_mut() {
                row.flags = propagate(
                    row.flags,
                    &row.causes,
                    &work_flags,
                    settings.zero_causes_compliant,
                );
            }
        }

        info!(rows = report.len(), "Sprint check completed");
        Ok(report)
    }

    /// Worklog statistics of the active sprints as of today.
    pub async fn stat(&self) -> Result<SprintStats, ReportError> {
        self.stat_on(Local::now().date_naive()).await
    }

    /// Worklog statistics with an explicit "today".
    #[instrument(skip(self))]
    pub async fn stat_on(&self, today: NaiveDate) -> Result<SprintStats, ReportError> {
        let sprints = self.issues(None).await?;
        let stats = aggregate_worklogs(
            self.tracker.as_ref(),
            &self.settings,
            &self.roster,
            sprints,
            today,
        )
        .await?;
        Ok(stats)
    }

    /// Active sprints with their issue rosters, optionally for one lead.
    pub async fn issues(&self, lead: Option<&str>) -> Result<ActiveSprints, ReportError> {
        let sprints =
            collect_active_sprints(self.tracker.as_ref(), &self.settings, &self.roster, lead)
                .await?;
        Ok(sprints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        descriptor, issue, issue_in_sprints, roster, settings, worklog, StaticTracker,
        SPRINT_FIELD,
    };
    use crate::worklog::EMPTY_SPRINT;
    use serde_json::json;

    fn service(tracker: StaticTracker) -> (ReportService, Arc<StaticTracker>) {
        let tracker = Arc::new(tracker);
        let service = ReportService::new(tracker.clone(), settings(), roster());
        (service, tracker)
    }

    fn tasks(keys: &[&str]) -> Vec<String> {
        keys.iter().map(ToString::to_string).collect()
    }

    fn compliant_fields() -> serde_json::Value {
        json!({
            "status": {"name": "In Progress"},
            "components": [{"name": "api"}],
            "timeoriginalestimate": 3600,
            "customfield_10645": {"name": "carol"}
        })
    }

    #[tokio::test]
    async fn test_check_rejects_blank_sprint() {
        let (service, tracker) = service(StaticTracker::default());
        let err = service.check("  ", &tasks(&["ECMDEV-1"])).await.unwrap_err();
        assert!(matches!(err, ReportError::EmptySprint));
        assert!(tracker.queries().is_empty());
    }

    #[tokio::test]
    async fn test_check_rejects_empty_task_list() {
        let (service, _) = service(StaticTracker::default());
        let err = service.check("S", &tasks(&["", " "])).await.unwrap_err();
        assert!(matches!(err, ReportError::EmptyTaskList));
        let err = service.check("S", &[]).await.unwrap_err();
        assert_eq!(err.to_string(), "Empty task list");
    }

    #[tokio::test]
    async fn test_check_in_sprint_differs_by_sprint() {
        let current = descriptor(2, "ACTIVE", "2024-03-01 Sprint Alice", "2024-03-01", "2024-03-14");
        let other = descriptor(3, "ACTIVE", "2024-02-15 Sprint Alice", "2024-02-15", "2024-02-28");
        let tracker = StaticTracker::default().with_issues(vec![
            issue_in_sprints("KEY-1", &[&current]),
            issue_in_sprints("KEY-2", &[&other]),
        ]);
        let (service, tracker) = service(tracker);

        let report = service
            .check("2024-03-01 Sprint Alice", &tasks(&["KEY-1", "KEY-2"]))
            .await
            .unwrap();

        assert!(report["KEY-1"].in_sprint);
        assert!(!report["KEY-2"].in_sprint);
        assert_eq!(
            tracker.queries(),
            vec!["project = ECMDEV and key in ('KEY-1','KEY-2')"]
        );
    }

    #[tokio::test]
    async fn test_check_reports_status_bus_key_and_own_flags() {
        let mut fields = compliant_fields();
        fields["issuelinks"] = json!([
            {"type": {"outward": "relates to"}, "outwardIssue": {"key": "ECMBUS-77"}}
        ]);
        let tracker = StaticTracker::default().with_issues(vec![issue("ECMDEV-1", fields)]);
        let (service, tracker) = service(tracker);

        let report = service.check("Sprint", &tasks(&["ECMDEV-1"])).await.unwrap();
        let row = &report["ECMDEV-1"];
        assert_eq!(row.status, "IN PROGRESS");
        assert_eq!(row.bus_key, "ECMBUS-77");
        assert_eq!(row.flags, ComplianceFlags::COMPLIANT);
        assert!(!row.in_sprint);
        // no causes, so no second search
        assert_eq!(tracker.queries().len(), 1);
    }

    #[tokio::test]
    async fn test_check_propagates_cause_flags() {
        let history = issue(
            "ECMDEV-1",
            json!({
                "status": {"name": "Open"},
                "issuelinks": [
                    {"type": {"outward": "causes"}, "outwardIssue": {"key": "ECMDEV-10"}},
                    {"type": {"outward": "causes"}, "outwardIssue": {"key": "ECMDEV-11"}}
                ]
            }),
        );
        let standalone = issue("ECMDEV-2", json!({"status": {"name": "Open"}}));
        let complete_work = issue("ECMDEV-10", compliant_fields());
        let mut no_curator = compliant_fields();
        no_curator["customfield_10645"] = json!(null);
        let curatorless_work = issue("ECMDEV-11", no_curator);

        let tracker = StaticTracker::default().with_issues(vec![
            history,
            standalone,
            complete_work,
            curatorless_work,
        ]);
        let (service, tracker) = service(tracker);

        let report = service
            .check("2024-03-01", &tasks(&["ECMDEV-1", "ECMDEV-2"]))
            .await
            .unwrap();

        let history = &report["ECMDEV-1"];
        assert_eq!(history.causes, vec!["ECMDEV-10", "ECMDEV-11"]);
        assert!(!history.flags.has_curator);
        assert!(history.flags.has_components);
        assert!(history.flags.has_estimate);

        // zero causes keeps the issue's own (non-compliant) flags
        let standalone = &report["ECMDEV-2"];
        assert!(!standalone.flags.has_curator);
        assert!(!standalone.flags.has_estimate);

        assert_eq!(
            tracker.queries()[1],
            "project = ECMDEV and key in ('ECMDEV-10','ECMDEV-11')"
        );
    }

    #[tokio::test]
    async fn test_check_zero_causes_compliant_policy() {
        let history = issue(
            "ECMDEV-1",
            json!({"issuelinks": [{"type": {"outward": "causes"}, "outwardIssue": {"key": "ECMDEV-10"}}]}),
        );
        let standalone = issue("ECMDEV-2", json!({}));
        let work = issue("ECMDEV-10", compliant_fields());
        let tracker = Arc::new(StaticTracker::default().with_issues(vec![history, standalone, work]));

        let mut legacy = settings();
        legacy.zero_causes_compliant = true;
        let service = ReportService::new(tracker, legacy, roster());

        let report = service
            .check("S", &tasks(&["ECMDEV-1", "ECMDEV-2"]))
            .await
            .unwrap();
        assert_eq!(report["ECMDEV-2"].flags, ComplianceFlags::COMPLIANT);
    }

    #[tokio::test]
    async fn test_check_surfaces_tracker_failure() {
        let (service, _) = service(StaticTracker::default().failing("boom"));
        let err = service.check("S", &tasks(&["ECMDEV-1"])).await.unwrap_err();
        assert!(!err.is_validation());
        assert!(err.to_string().contains("boom"));
    }

    #[tokio::test]
    async fn test_stat_runs_collection_then_aggregation() {
        let alice = descriptor(2, "ACTIVE", "2024-03-01 Sprint Alice", "2024-03-01", "2024-03-14");
        let work = issue_in_sprints("ECMDEV-1", &[&alice]);
        let admin = issue("ECMDEV-9", json!({ SPRINT_FIELD: [] }));
        let tracker = StaticTracker::default()
            .with_open_sprints(vec![work.clone()])
            .with_worklog_issues(vec![work, admin])
            .with_worklogs(
                "ECMDEV-1",
                vec![worklog("bob", "2024-03-04T12:00:00.000+0300", 1200)],
            )
            .with_worklogs(
                "ECMDEV-9",
                vec![worklog("alice", "2024-03-04T12:00:00.000+0300", 60)],
            );
        let (service, _) = service(tracker);

        let stats = service
            .stat_on(NaiveDate::from_ymd_opt(2024, 3, 10).unwrap())
            .await
            .unwrap();
        assert_eq!(stats["2024-03-01 Sprint Alice"].spent_by("bob"), 1200);
        assert_eq!(stats[EMPTY_SPRINT].spent_by("alice"), 60);
    }

    #[tokio::test]
    async fn test_issues_with_lead_filter() {
        let alice = descriptor(2, "ACTIVE", "2024-03-01 Sprint Alice", "2024-03-01", "2024-03-14");
        let tracker = StaticTracker::default()
            .with_open_sprints(vec![issue_in_sprints("ECMDEV-1", &[&alice])]);
        let (service, _) = service(tracker);

        assert_eq!(service.issues(None).await.unwrap().len(), 1);
        assert!(service.issues(Some("dave")).await.unwrap().is_empty());
    }
}
