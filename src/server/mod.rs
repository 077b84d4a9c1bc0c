//! HTTP service surface.
//!
//! Routes:
//! - `GET  /health`
//! - `POST /api/log`                  client audit events into the server log
//! - `POST /api/generate`             template -> base PDF
//! - `POST /api/process`              PDF -> transformed PDF
//! - `POST /api/workflow`             full orchestrated run
//! - `GET  /api/projects`             archived projects, newest first
//! - `GET  /api/projects/:trace_id`   one archived project

pub mod error;
pub mod handlers;
pub mod models;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::ResolvedConfig;
use crate::core::{Orchestrator, ProjectHistory};

pub use error::ApiError;

/// Shared state for all handlers
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub history: ProjectHistory,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator,
            history: ProjectHistory::new(),
        }
    }
}

/// Build the router
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/log", post(handlers::log_event))
        .route("/api/generate", post(handlers::generate))
        .route("/api/process", post(handlers::process))
        .route("/api/workflow", post(handlers::run_workflow))
        .route("/api/projects", get(handlers::list_projects))
        .route("/api/projects/:trace_id", get(handlers::get_project))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve until the process is stopped
pub async fn serve(config: &ResolvedConfig, port: u16) -> Result<()> {
    if !config.service.has_credentials() {
        tracing::warn!("No cloud service credentials configured; remote calls will be rejected");
    }

    let orchestrator = Orchestrator::from_config(config)?;
    let app = router(Arc::new(AppState::new(orchestrator)));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Starting sentinel API on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
