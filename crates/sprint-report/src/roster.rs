//! Developer and team-lead roster.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::config::Config;

/// A single roster entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Developer {
    /// Display name, also used to recognise a lead's sprints.
    #[serde(rename = "NAME", alias = "name")]
    pub name: String,
    /// Code of this developer's team lead.
    #[serde(rename = "LEAD", alias = "lead", default)]
    pub lead: String,
}

/// Known team members keyed by developer code.
///
/// A developer whose code appears as another entry's `lead` is a team lead.
/// Lead codes that point nowhere, or at the developer itself, are tolerated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Roster {
    developers: BTreeMap<String, Developer>,
}

impl Roster {
    /// Build a roster from `(code, developer)` pairs.
    pub fn new(developers: impl IntoIterator<Item = (String, Developer)>) -> Self {
        Self {
            developers: developers.into_iter().collect(),
        }
    }

    /// Parse a roster from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse developer roster")
    }

    /// Load the roster named by the configuration.
    ///
    /// Inline JSON wins over a file. With neither set the roster is empty.
    pub fn load(config: &Config) -> Result<Self> {
        if let Some(json) = &config.developers {
            return Self::from_json(json);
        }
        match &config.developers_file {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Read a roster JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read roster file {}", path.display()))?;
        Self::from_json(&json)
    }

    pub fn len(&self) -> usize {
        self.developers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.developers.is_empty()
    }

    /// Whether `code` is a known team member.
    pub fn contains(&self, code: &str) -> bool {
        self.developers.contains_key(code)
    }

    pub fn get(&self, code: &str) -> Option<&Developer> {
        self.developers.get(code)
    }

    /// Codes of every developer reporting to `lead`.
    pub fn wards(&self, lead: &str) -> Vec<String> {
        self.developers
            .iter()
            .filter(|(_, developer)| developer.lead == lead)
            .map(|(code, _)| code.clone())
            .collect()
    }

    /// Union of the wards of several leads. Blank lead codes are ignored.
    pub fn team_members<'a>(&self, leads: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
        leads
            .into_iter()
            .filter(|lead| !lead.is_empty())
            .flat_map(|lead| self.wards(lead))
            .collect()
    }

    /// Resolve the lead owning a sprint from the sprint's name.
    ///
    /// Sprint names embed the lead's display name. Returns the lead with the
    /// longest name occurring in `sprint_name`, so "Anna" wins over "Ann".
    /// Equal lengths resolve in code order. Empty when no lead matches.
    pub fn sprint_lead(&self, sprint_name: &str) -> String {
        self.developers
            .values()
            .filter_map(|developer| {
                let lead = self.developers.get(&developer.lead)?;
                Some((developer.lead.as_str(), lead.name.as_str()))
            })
            .filter(|(_, lead_name)| !lead_name.is_empty() && sprint_name.contains(lead_name))
            .min_by_key(|(_, lead_name)| Reverse(lead_name.chars().count()))
            .map(|(code, _)| code.to_string())
            .unwrap_or_default()
    }
}
