//! Issue link analysis: Bus keys and "causes" relations.
//!
//! A History issue links to the Work issues implementing it through a link
//! type whose outward verb is `causes`. A History issue's compliance is the
//! compliance of its Work issues.

use std::collections::{BTreeMap, HashMap};
use tracing::{debug, instrument};

use crate::client::IssueTracker;
use crate::compliance::ComplianceFlags;
use crate::config::TrackerSettings;
use crate::error::TrackerError;
use crate::jql;
use crate::models::IssueLink;

const CAUSES: &str = "causes";

/// What the links of one issue tell us.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkSummary {
    /// Key of the linked Bus ticket, empty when none
    pub bus_key: String,
    /// Keys of the Work issues this issue causes
    pub causes: Vec<String>,
}

fn is_cause(link: &IssueLink) -> Option<&str> {
    if link.link_type.outward != CAUSES {
        return None;
    }
    link.outward_issue.as_ref().map(|issue| issue.key.as_str())
}

/// Keys of every Work issue linked with "causes".
pub fn cause_keys(links: &[IssueLink]) -> Vec<String> {
    links
        .iter()
        .filter_map(is_cause)
        .map(ToString::to_string)
        .collect()
}

/// Walk links in order, collecting causes until the first Bus ticket.
///
/// The first link to a key containing `bus_project` wins and ends the walk;
/// causes listed after it are not collected.
pub fn scan_links(links: &[IssueLink], bus_project: &str) -> LinkSummary {
    let mut summary = LinkSummary::default();

    for link in links {
        let bus = [&link.inward_issue, &link.outward_issue]
            .into_iter()
            .flatten()
            .find(|issue| issue.key.contains(bus_project));
        if let Some(issue) = bus {
            summary.bus_key.clone_from(&issue.key);
            break;
        }

        if let Some(key) = is_cause(link) {
            summary.causes.push(key.to_string());
        }
    }

    summary
}

/// Work issues of a batch, each mapped to the History issue that causes it.
#[derive(Debug, Clone, Default)]
pub struct CauseIndex {
    explained_by: BTreeMap<String, String>,
}

impl CauseIndex {
    pub fn record(&mut self, history_key: &str, causes: &[String]) {
        for work_key in causes {
            self.explained_by
                .insert(work_key.clone(), history_key.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.explained_by.is_empty()
    }

    /// Work issues absent from `found`, each with the History issue it explains.
    pub fn missing_from<V>(&self, found: &HashMap<String, V>) -> Vec<(&str, &str)> {
        self.explained_by
            .iter()
            .filter(|(work, _)| !found.contains_key(*work))
            .map(|(work, history)| (work.as_str(), history.as_str()))
            .collect()
    }

    pub fn work_keys(&self) -> Vec<&str> {
        self.explained_by.keys().map(String::as_str).collect()
    }

    /// Fetch every Work issue in one search and evaluate its flags.
    #[instrument(skip_all, fields(work_issues = self.explained_by.len()))]
    pub async fn fetch_flags(
        &self,
        tracker: &dyn IssueTracker,
        settings: &TrackerSettings,
    ) -> Result<HashMap<String, ComplianceFlags>, TrackerError> {
        if self.is_empty() {
            return Ok(HashMap::new());
        }

        let query = jql::issues_by_key(&settings.project, &self.work_keys());
        let issues = tracker.search(&query, settings.max_results).await?;
        debug!(count = issues.len(), "Fetched work issues");

        let flags: HashMap<String, ComplianceFlags> = issues
            .iter()
            .map(|issue| {
                (
                    issue.key.clone(),
                    ComplianceFlags::evaluate(issue, &settings.curator_field),
                )
            })
            .collect();

        for (work, history) in self.missing_from(&flags) {
            debug!(work, history, "Work issue missing from search, history counts as non-compliant");
        }

        Ok(flags)
    }
}

/// Compliance of a History issue derived from its Work issues.
///
/// The AND starts from all-true. A cause missing from `work_flags` counts as
/// non-compliant. With no causes the issue keeps `own` unless
/// `zero_causes_compliant` is set.
pub fn propagate(
    own: ComplianceFlags,
    causes: &[String],
    work_flags: &HashMap<String, ComplianceFlags>,
    zero_causes_compliant: bool,
) -> ComplianceFlags {
    if causes.is_empty() {
        return if zero_causes_compliant {
            ComplianceFlags::COMPLIANT
        } else {
            own
        };
    }

    causes.iter().fold(ComplianceFlags::COMPLIANT, |acc, key| {
        let flags = work_flags.get(key).copied().unwrap_or(ComplianceFlags {
            has_curator: false,
            has_components: false,
            has_estimate: false,
        });
        acc.and(flags)
    })
}
