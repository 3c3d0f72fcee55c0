//! Collection of currently open sprints and their issues.

use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

use crate::client::IssueTracker;
use crate::config::TrackerSettings;
use crate::error::TrackerError;
use crate::issue::IssueRecord;
use crate::jql;
use crate::roster::Roster;
use crate::sprint::current_sprint;

/// Open sprints keyed by sprint name, in name order.
pub type ActiveSprints = BTreeMap<String, crate::sprint::Sprint>;

/// Query open sprints and build each sprint's issue roster.
///
/// An issue belongs to its last sprint, which the open-sprints filter
/// guarantees to be active. With `lead` set, sprints owned by other leads are
/// left out. The first issue seen for a sprint seeds the sprint record.
#[instrument(skip(tracker, settings, roster))]
pub async fn collect_active_sprints(
    tracker: &dyn IssueTracker,
    settings: &TrackerSettings,
    roster: &Roster,
    lead: Option<&str>,
) -> Result<ActiveSprints, TrackerError> {
    let query = jql::open_sprints(&settings.project);
    let issues = tracker.search(&query, settings.max_results).await?;

    let mut sprints = ActiveSprints::new();
    for issue in &issues {
        let Some(sprint) = current_sprint(issue, &settings.sprint_field, roster) else {
            debug!(issue = %issue.key, "Issue has no parsable sprint");
            continue;
        };

        if lead.is_some_and(|lead| !lead.is_empty() && sprint.lead != lead) {
            continue;
        }

        let record = IssueRecord::from_issue(issue, settings, roster);
        sprints
            .entry(sprint.name.clone())
            .or_insert(sprint)
            .issues
            .insert(record.key.clone(), record);
    }

    info!(
        issues = issues.len(),
        sprints = sprints.len(),
        "Collected active sprints"
    );
    Ok(sprints)
}
