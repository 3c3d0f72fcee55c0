//! HTTP server for the sprint report endpoints.

use axum::{
    extract::{rejection::QueryRejection, Query, Request, State},
    http::StatusCode,
    middleware::{from_fn_with_state, Next},
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, warn};

use crate::active::ActiveSprints;
use crate::error::ReportError;
use crate::service::{CheckReport, ReportService};
use crate::worklog::SprintStats;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Report operations.
    pub service: Arc<ReportService>,
    /// Shared secret required on every sprint request; `None` rejects all.
    pub hash: Option<Arc<str>>,
}

impl AppState {
    pub fn new(service: ReportService, hash: Option<&str>) -> Self {
        Self {
            service: Arc::new(service),
            hash: hash.filter(|h| !h.is_empty()).map(Arc::from),
        }
    }
}

/// Build the HTTP router, mounting the sprint endpoints under `prefix`.
pub fn build_router(state: AppState, prefix: &str) -> Router {
    let sprint = Router::new()
        .route("/sprint/check", get(check_handler))
        .route("/sprint/stat", get(stat_handler))
        .route("/sprint/issues", get(issues_handler))
        .route_layer(from_fn_with_state(state.clone(), require_hash));

    let prefix = prefix.trim_matches('/');
    let router = if prefix.is_empty() {
        Router::new().merge(sprint)
    } else {
        Router::new().nest(&format!("/{prefix}"), sprint)
    };

    router
        .route("/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

impl IntoResponse for ReportError {
    fn into_response(self) -> Response {
        if self.is_validation() {
            debug!(error = %self, "Rejected request");
            return (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": self.to_string() })),
            )
                .into_response();
        }

        error!(error = %self, "Report failed");
        (StatusCode::FORBIDDEN, Json(Value::String(self.to_string()))).into_response()
    }
}

#[derive(Debug, Deserialize)]
struct HashQuery {
    hash: Option<String>,
}

fn hash_matches(expected: Option<&str>, given: Option<&str>) -> bool {
    match (expected, given) {
        (Some(expected), Some(given)) if !given.is_empty() => {
            expected.as_bytes().ct_eq(given.as_bytes()).into()
        }
        _ => false,
    }
}

/// Reject requests that do not carry the configured `hash` parameter.
async fn require_hash(
    State(state): State<AppState>,
    query: Result<Query<HashQuery>, QueryRejection>,
    request: Request,
    next: Next,
) -> Response {
    // an unreadable query string carries no usable hash
    let given = query.ok().and_then(|Query(query)| query.hash);
    if !hash_matches(state.hash.as_deref(), given.as_deref()) {
        warn!(path = %request.uri().path(), "Wrong hash");
        return (
            StatusCode::FORBIDDEN,
            Json(json!({ "error": "Wrong hash" })),
        )
            .into_response();
    }
    next.run(request).await
}

#[derive(Debug, Deserialize)]
struct CheckQuery {
    #[serde(default)]
    sprint: String,
    /// Comma-separated issue keys
    #[serde(default)]
    tasks: String,
}

async fn check_handler(
    State(state): State<AppState>,
    Query(query): Query<CheckQuery>,
) -> Result<Json<CheckReport>, ReportError> {
    let tasks: Vec<String> = query.tasks.split(',').map(ToString::to_string).collect();
    let report = state.service.check(&query.sprint, &tasks).await?;
    Ok(Json(report))
}

async fn stat_handler(State(state): State<AppState>) -> Result<Json<SprintStats>, ReportError> {
    let stats = state.service.stat().await?;
    Ok(Json(stats))
}

#[derive(Debug, Deserialize)]
struct IssuesQuery {
    lead: Option<String>,
}

async fn issues_handler(
    State(state): State<AppState>,
    Query(query): Query<IssuesQuery>,
) -> Result<Json<ActiveSprints>, ReportError> {
    let sprints = state.service.issues(query.lead.as_deref()).await?;
    Ok(Json(sprints))
}

/// Health check endpoint.
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}
