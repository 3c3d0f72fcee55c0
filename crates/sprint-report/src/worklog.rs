//! Worklog aggregation per active sprint.
//!
//! Time logged by team members is attributed to the sprint the issue is
//! currently in, provided the work was logged during that sprint. Issues
//! outside every active sprint land in the [`EMPTY_SPRINT`] bucket.

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

use crate::active::ActiveSprints;
use crate::client::IssueTracker;
use crate::config::TrackerSettings;
use crate::error::TrackerError;
use crate::issue::IssueRecord;
use crate::jql;
use crate::roster::Roster;
use crate::sprint::{convert_date, current_sprint, DayBoundary, Sprint};

/// Bucket for time logged on issues without an active sprint.
pub const EMPTY_SPRINT: &str = "EMPTY_SPRINT";

/// Worklog of one sprint, keyed by author code then issue key.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SprintBucket {
    /// Sprint metadata and roster, absent for the no-sprint bucket
    #[serde(flatten)]
    pub sprint: Option<Sprint>,
    pub worklog: BTreeMap<String, BTreeMap<String, IssueRecord>>,
}

impl SprintBucket {
    fn for_sprint(sprint: Sprint) -> Self {
        Self {
            sprint: Some(sprint),
            worklog: BTreeMap::new(),
        }
    }

    /// Seconds logged into this bucket by `author`.
    pub fn spent_by(&self, author: &str) -> i64 {
        self.worklog
            .get(author)
            .map(|issues| issues.values().map(|r| r.spent_time).sum())
            .unwrap_or(0)
    }
}

/// Worklog buckets keyed by sprint name.
pub type SprintStats = BTreeMap<String, SprintBucket>;

/// Date window covering every sprint, seeded with `today`.
pub fn worklog_window<'a>(
    sprints: impl IntoIterator<Item = &'a Sprint>,
    today: NaiveDate,
) -> (NaiveDate, NaiveDate) {
    sprints
        .into_iter()
        .fold((today, today), |(from, to), sprint| {
            (
                from.min(sprint.start_date.date()),
                to.max(sprint.end_date.date()),
            )
        })
}

/// Attribute team worklogs to the given active sprints.
#[instrument(skip_all, fields(sprints = sprints.len()))]
pub async fn aggregate_worklogs(
    tracker: &dyn IssueTracker,
    settings: &TrackerSettings,
    roster: &Roster,
    sprints: ActiveSprints,
    today: NaiveDate,
) -> Result<SprintStats, TrackerError> {
    if sprints.is_empty() {
        return Ok(SprintStats::new());
    }

    let (from, to) = worklog_window(sprints.values(), today);
    let members = roster.team_members(sprints.values().map(|s| s.lead.as_str()));

    let mut stats: SprintStats = sprints
        .into_iter()
        .map(|(name, sprint)| (name, SprintBucket::for_sprint(sprint)))
        .collect();

    if members.is_empty() {
        info!("No team members for active sprints, skipping worklog query");
        return Ok(stats);
    }

    let query = jql::worklogs_between(&settings.project, from, to, &members);
    let issues = tracker.search(&query, settings.max_results).await?;
    debug!(count = issues.len(), %from, %to, "Issues with team worklogs");

    for issue in &issues {
        let sprint = current_sprint(issue, &settings.sprint_field, roster).filter(|sprint| {
            stats
                .get(&sprint.name)
                .is_some_and(|bucket| bucket.sprint.is_some())
        });

        let worklogs = tracker.worklogs(&issue.key).await?;
        for entry in worklogs {
            let author = &entry.author.name;
            if !roster.contains(author) {
                continue;
            }

            let bucket_name = match &sprint {
                None => EMPTY_SPRINT,
                Some(sprint) => {
                    let Some(logged) = convert_date(&entry.started, DayBoundary::Start) else {
                        debug!(issue = %issue.key, started = %entry.started, "Unparsable worklog date");
                        continue;
                    };
                    if !sprint.covers(logged) {
                        continue;
                    }
                    sprint.name.as_str()
                }
            };

            let record = stats
                .entry(bucket_name.to_string())
                .or_default()
                .worklog
                .entry(author.clone())
                .or_default()
                .entry(issue.key.clone())
                .or_insert_with(|| IssueRecord::from_issue(issue, settings, roster));
            record.spent_time += entry.time_spent_seconds;
        }
    }

    Ok(stats)
}
