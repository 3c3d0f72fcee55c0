//! Sprint report service binary.
//!
//! Standalone HTTP service answering sprint compliance and worklog reports
//! from Jira.
//!
//! # Environment Variables
//!
//! - `JIRA_URL` - Jira base URL (required)
//! - `JIRA_USER` / `JIRA_TOKEN` - credentials
//! - `SPRINT_REPORT_HASH` - shared secret every request must carry
//! - `SPRINT_REPORT_DEVELOPERS` / `SPRINT_REPORT_DEVELOPERS_FILE` - team roster

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use sprint_report::{server, Config, JiraClient, ReportService, Roster};

/// Jira sprint report service.
#[derive(Parser)]
#[command(name = "sprint-report")]
#[command(about = "Serve sprint compliance and worklog reports from Jira")]
#[command(version)]
struct Cli {
    /// Listen port (overrides `SPRINT_REPORT_PORT`)
    #[arg(long)]
    port: Option<u16>,

    /// Roster JSON file (overrides `SPRINT_REPORT_DEVELOPERS_FILE`)
    #[arg(long)]
    developers_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env().add_directive("sprint_report=info".parse()?))
        .init();

    info!("Starting sprint report service...");

    // Load configuration
    let mut config = Config::default();
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(path) = cli.developers_file {
        config.developers = None;
        config.developers_file = Some(path);
    }

    if config.hash.is_none() {
        warn!("SPRINT_REPORT_HASH is not set. Every sprint request will be rejected.");
    }

    let roster = Roster::load(&config).context("Failed to load developer roster")?;
    if roster.is_empty() {
        warn!("Developer roster is empty. Worklog reports will be empty.");
    } else {
        info!(developers = roster.len(), "Developer roster loaded");
    }

    let client = JiraClient::from_config(&config.jira).context("Failed to create Jira client")?;
    info!(project = %config.tracker.project, "Jira client configured");

    let service = ReportService::new(Arc::new(client), config.tracker.clone(), roster);
    let state = server::AppState::new(service, config.hash.as_deref());

    // Build router
    let app = server::build_router(state, &config.prefix);

    // Bind and serve
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(port = config.port, prefix = %config.prefix, "Sprint report service listening");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
