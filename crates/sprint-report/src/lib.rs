//! Sprint compliance and worklog reporting for Jira.
//!
//! This crate provides:
//! - Jira REST client behind the `IssueTracker` trait
//! - Sprint descriptor parsing and sprint membership
//! - Compliance checks with "causes" propagation from Work to History issues
//! - Worklog aggregation per active sprint and team
//! - HTTP server exposing the reports (standalone service)

pub mod active;
pub mod client;
pub mod compliance;
pub mod config;
pub mod error;
pub mod issue;
pub mod jql;
pub mod links;
pub mod models;
pub mod roster;
pub mod server;
pub mod service;
pub mod sprint;
pub mod worklog;

#[cfg(test)]
mod testing;

pub use client::{IssueTracker, JiraClient};
pub use config::Config;
pub use error::{ReportError, TrackerError};
pub use roster::Roster;
pub use service::ReportService;
