//! HTTP handlers. Thin pass-throughs to the renderer, the service client
//! and the orchestrator.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::adapters::convert_html_to_pdf;
use crate::core::{PipelineError, ProjectSummary, WATERMARK_FLAG};
use crate::domain::{canonical_order, find_template, parse_operations, Outcome, Project, TransformOp};

use super::error::ApiError;
use super::models::*;
use super::AppState;

const DEFAULT_LIST_LIMIT: usize = 20;

/// Health check endpoint
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "time": Utc::now(),
    }))
}

/// Accept a client-side audit event and mirror it into the server log
pub async fn log_event(Json(req): Json<LogRequest>) -> (StatusCode, Json<Value>) {
    match req.status {
        Outcome::Error => tracing::error!(
            step = %req.step,
            action = %req.action,
            trace_id = ?req.trace_id,
            metadata = ?req.metadata,
            "Client event"
        ),
        _ => tracing::info!(
            step = %req.step,
            action = %req.action,
            status = %req.status,
            trace_id = ?req.trace_id,
            "Client event"
        ),
    }

    (StatusCode::ACCEPTED, Json(json!({ "accepted": true })))
}

/// Render a template and convert it to a base PDF
pub async fn generate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<PdfResponse>, ApiError> {
    let operations = parse_services(&req.services)?;

    let mut fields = req.data;
    fields.insert(
        WATERMARK_FLAG.to_string(),
        operations.contains(&TransformOp::Watermark).to_string(),
    );

    let orchestrator = &state.orchestrator;
    let html = orchestrator.renderer().render(&req.template_id, &fields)?;
    let pdf = convert_html_to_pdf(orchestrator.service(), &html, orchestrator.poll_policy()).await?;

    tracing::info!(template = %req.template_id, size_bytes = pdf.len(), "Generated document");
    Ok(Json(PdfResponse::new(&pdf, Vec::new())))
}

/// Apply the selected transforms to a PDF (fail-open per operation)
pub async fn process(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ProcessRequest>,
) -> Result<Json<PdfResponse>, ApiError> {
    let mut pdf = BASE64
        .decode(req.pdf_base64.trim())
        .map_err(|e| ApiError::InvalidRequest(format!("Invalid PDF base64: {}", e)))?;
    let operations = canonical_order(&parse_services(&req.services)?);

    let mut degraded = Vec::new();
    for operation in operations {
        let outcome = state.orchestrator.transformer().apply(operation, pdf).await;
        if outcome.is_degraded() {
            degraded.push(operation);
        }
        pdf = outcome.bytes;
    }

    Ok(Json(PdfResponse::new(&pdf, degraded)))
}

/// Run the whole workflow and archive the finished project
pub async fn run_workflow(
    State(state): State<Arc<AppState>>,
    Json(req): Json<WorkflowRequest>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    let operations = parse_services(&req.services)?;
    let name = req.name.unwrap_or_else(|| {
        let template_name = find_template(&req.template_id)
            .map(|t| t.name)
            .unwrap_or("Custom Document");
        format!("{} Auto-Gen", template_name)
    });

    let project = Project::new(name, req.template_id, req.data, operations, req.signee_email);
    let result = state
        .orchestrator
        .run(project, |patch| {
            tracing::debug!(status = ?patch.status, "Project update");
        })
        .await;

    match result {
        Ok(project) => {
            state.history.archive(project.clone()).await;
            Ok((StatusCode::OK, Json(project)))
        }
        Err(failure) => {
            if let PipelineError::InvalidProject(ref reason) = failure.source {
                return Err(ApiError::InvalidRequest(reason.clone()));
            }
            let project = *failure.project;
            state.history.archive(project.clone()).await;
            Ok((StatusCode::BAD_GATEWAY, Json(project)))
        }
    }
}

/// List archived projects, most recent first
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProjectsQuery>,
) -> Json<Vec<ProjectSummary>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    Json(state.history.list(limit).await)
}

/// Look up an archived project by trace id
pub async fn get_project(
    State(state): State<Arc<AppState>>,
    Path(trace_id): Path<Uuid>,
) -> Result<Json<Project>, ApiError> {
    state
        .history
        .find_by_trace(trace_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("project with trace {}", trace_id)))
}

fn parse_services(services: &[String]) -> Result<Vec<TransformOp>, ApiError> {
    parse_operations(services).map_err(|e| ApiError::InvalidRequest(e.to_string()))
}
