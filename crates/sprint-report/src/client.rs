//! Jira REST client.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, instrument, warn};

use crate::config::JiraConfig;
use crate::error::TrackerError;
use crate::models::{Issue, SearchResponse, Worklog, WorklogResponse};

/// Read-only access to the issue tracker.
///
/// Reports only ever search issues and read worklogs, so this is the whole
/// surface the service needs.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Run a JQL search returning at most `max_results` issues.
    ///
    /// Fails with [`TrackerError::Incomplete`] when more issues match than
    /// fit in the page.
    async fn search(&self, jql: &str, max_results: u32) -> Result<Vec<Issue>, TrackerError>;

    /// Fetch every worklog entry of an issue.
    ///
    /// Fails with [`TrackerError::Incomplete`] when fewer entries than the
    /// reported total can be retrieved.
    async fn worklogs(&self, issue_key: &str) -> Result<Vec<Worklog>, TrackerError>;
}

#[derive(Clone)]
enum Auth {
    Basic { user: String, token: String },
    Bearer(String),
    None,
}

/// Search request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    jql: &'a str,
    start_at: u32,
    max_results: u32,
    fields: [&'static str; 1],
}

/// Jira REST API v2 client.
#[derive(Clone)]
pub struct JiraClient {
    client: reqwest::Client,
    base_url: String,
    auth: Auth,
}

impl std::fmt::Debug for JiraClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JiraClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl JiraClient {
    /// Create a client for the Jira instance at `base_url`.
    ///
    /// With a `user`, the token is sent as basic-auth password; otherwise it
    /// is sent as a bearer token (personal access token).
    pub fn new(base_url: &str, user: Option<&str>, token: Option<&str>) -> Result<Self> {
        if base_url.trim().is_empty() {
            return Err(anyhow!("Jira base URL is required"));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("sprint-report/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        let auth = match (user, token) {
            (Some(user), token) => Auth::Basic {
                user: user.to_string(),
                token: token.unwrap_or_default().to_string(),
            },
            (None, Some(token)) => Auth::Bearer(token.to_string()),
            (None, None) => Auth::None,
        };

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    /// Create a client from the connection settings.
    pub fn from_config(config: &JiraConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| anyhow!("JIRA_URL is not set"))?;
        Self::new(url, config.user.as_deref(), config.token.as_deref())
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Auth::Basic { user, token } => request.basic_auth(user, Some(token)),
            Auth::Bearer(token) => request.bearer_auth(token),
            Auth::None => request,
        }
    }

    /// Send a request and decode a successful JSON body.
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, TrackerError> {
        let response = self.authorize(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(TrackerError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(TrackerError::Serialization)
    }
}

#[async_trait]
impl IssueTracker for JiraClient {
    #[instrument(skip(self))]
    async fn search(&self, jql: &str, max_results: u32) -> Result<Vec<Issue>, TrackerError> {
        let url = format!("{}/rest/api/2/search", self.base_url);
        let body = SearchRequest {
            jql,
            start_at: 0,
            max_results,
            fields: ["*all"],
        };

        let response: SearchResponse = self.send(self.client.post(&url).json(&body)).await?;

        let fetched = response.issues.len() as u64;
        if response.total > fetched {
            warn!(total = response.total, fetched, "Search result set is incomplete");
            return Err(TrackerError::Incomplete {
                total: response.total,
                fetched,
            });
        }

        debug!(count = fetched, "Search completed");
        Ok(response.issues)
    }

    #[instrument(skip(self))]
    async fn worklogs(&self, issue_key: &str) -> Result<Vec<Worklog>, TrackerError> {
        let url = format!("{}/rest/api/2/issue/{issue_key}/worklog", self.base_url);
        let mut worklogs = Vec::new();

        loop {
            let page_url = format!("{url}?startAt={}", worklogs.len());
            let page: WorklogResponse = self.send(self.client.get(&page_url)).await?;
            let received = page.worklogs.len();
            worklogs.extend(page.worklogs);

            let fetched = worklogs.len() as u64;
            if fetched >= page.total {
                break;
            }
            if received == 0 {
                warn!(total = page.total, fetched, "Worklog list is incomplete");
                return Err(TrackerError::Incomplete {
                    total: page.total,
                    fetched,
                });
            }
        }

        debug!(count = worklogs.len(), "Fetched worklogs");
        Ok(worklogs)
    }
}
