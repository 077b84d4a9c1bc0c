//! Workflow orchestrator.
//!
//! Drives one project through generate, transform, sign and archive,
//! recording every attempted operation in the project's audit ledger and
//! publishing each mutation to the caller's observer as it happens.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{convert_html_to_pdf, PdfServiceApi, PdfServicesClient, PollPolicy, ServiceError};
use crate::config::ResolvedConfig;
use crate::domain::events::{
    STEP_CLOUD_SERVICES, STEP_CRITICAL, STEP_DOCGEN, STEP_ESIGN, STEP_ORCHESTRATOR, STEP_VAULT,
};
use crate::domain::{
    canonical_order, Artifact, InvalidTransition, Outcome, Project, ProjectPatch, ProjectStatus,
};

use super::renderer::{DocumentRenderer, TemplateRenderer, WATERMARK_FLAG};
use super::transforms::Transformer;

pub const DEFAULT_SIGNING_DELAY: Duration = Duration::from_millis(800);
pub const DEFAULT_WATERMARK_LABEL: &str = "OFFICIAL COPY";

/// Errors that abort a workflow run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("document rendering failed: {0}")]
    Render(#[source] anyhow::Error),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error(transparent)]
    Transition(#[from] InvalidTransition),

    #[error("invalid project: {0}")]
    InvalidProject(String),

    #[error("final artifact is empty")]
    EmptyArtifact,
}

/// A failed run: the project as it stood when the run stopped, plus the cause
#[derive(Debug, Error)]
#[error("pipeline failed for project {}: {}", .project.id, .source)]
pub struct PipelineFailure {
    pub project: Box<Project>,
    #[source]
    pub source: PipelineError,
}

/// Main workflow orchestrator
#[derive(Clone)]
pub struct Orchestrator {
    service: Arc<dyn PdfServiceApi>,
    renderer: Arc<dyn DocumentRenderer>,
    transformer: Transformer,
    poll: PollPolicy,
    signing_delay: Duration,
}

impl Orchestrator {
    /// Create an orchestrator with default policies
    pub fn new(service: Arc<dyn PdfServiceApi>) -> Self {
        let poll = PollPolicy::default();
        Self {
            transformer: Transformer::new(service.clone(), poll, DEFAULT_WATERMARK_LABEL),
            renderer: Arc::new(TemplateRenderer),
            service,
            poll,
            signing_delay: DEFAULT_SIGNING_DELAY,
        }
    }

    /// Create an orchestrator talking to the real service described by `config`
    pub fn from_config(config: &ResolvedConfig) -> Result<Self> {
        let client = PdfServicesClient::new(&config.service)?;
        Ok(Self::with_service(Arc::new(client), config))
    }

    /// Create an orchestrator over any service, with policies from `config`
    pub fn with_service(service: Arc<dyn PdfServiceApi>, config: &ResolvedConfig) -> Self {
        Self {
            transformer: Transformer::new(service.clone(), config.polling, config.watermark_label.clone()),
            renderer: Arc::new(TemplateRenderer),
            service,
            poll: config.polling,
            signing_delay: config.signing_delay(),
        }
    }

    pub fn with_renderer(mut self, renderer: Arc<dyn DocumentRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self.transformer = Transformer::new(
            self.service.clone(),
            poll,
            self.transformer.watermark_label().to_string(),
        );
        self
    }

    pub fn with_signing_delay(mut self, delay: Duration) -> Self {
        self.signing_delay = delay;
        self
    }

    pub fn service(&self) -> &dyn PdfServiceApi {
        self.service.as_ref()
    }

    pub fn renderer(&self) -> &dyn DocumentRenderer {
        self.renderer.as_ref()
    }

    pub fn transformer(&self) -> &Transformer {
        &self.transformer
    }

    pub fn poll_policy(&self) -> &PollPolicy {
        &self.poll
    }

    /// Run the full workflow for an IDLE project.
    ///
    /// `on_update` is called synchronously after every status change and
    /// every appended event. On failure the returned [`PipelineFailure`]
    /// carries the project in ERROR state with a CRITICAL event as its last
    /// entry.
    #[instrument(skip_all, fields(project = %project.id, template = %project.template_id))]
    pub async fn run<F>(&self, project: Project, on_update: F) -> Result<Project, PipelineFailure>
    where
        F: FnMut(&ProjectPatch) + Send,
    {
        if let Err(source) = validate(&project) {
            warn!(error = %source, "Refusing to start workflow");
            return Err(PipelineFailure {
                project: Box::new(project),
                source,
            });
        }

        let mut session = Session { project, on_update };
        match self.execute(&mut session).await {
            Ok(()) => {
                info!(trace_id = ?session.project.trace_id(), "Workflow completed");
                Ok(session.project)
            }
            Err(e) => Err(session.fail(e)),
        }
    }

    async fn execute<F>(&self, session: &mut Session<F>) -> Result<(), PipelineError>
    where
        F: FnMut(&ProjectPatch) + Send,
    {
        // 1. Initialization
        let trace_id = Uuid::new_v4();
        session.assign_trace_id(trace_id);
        session.transition(ProjectStatus::Generating)?;
        let template_id = session.project.template_id.clone();
        session.record(
            STEP_ORCHESTRATOR,
            "Workflow Initialized",
            Outcome::Info,
            json!({ "traceId": trace_id, "template": template_id }),
        );

        // 2. Render
        let mut fields = session.project.fields.clone();
        fields.insert(
            WATERMARK_FLAG.to_string(),
            session.project.has_watermark().to_string(),
        );
        let html = self
            .renderer
            .render(&template_id, &fields)
            .map_err(PipelineError::Render)?;

        // 3. Base PDF
        session.record(
            STEP_DOCGEN,
            "Convert HTML to PDF",
            Outcome::Info,
            json!({
                "service": self.service.name(),
                "input_bytes": html.len(),
                "fields": session.project.fields.len(),
            }),
        );
        let mut pdf = convert_html_to_pdf(self.service.as_ref(), &html, &self.poll).await?;
        session.record(
            STEP_DOCGEN,
            "Generation Successful",
            Outcome::Success,
            json!({ "size_bytes": pdf.len(), "format": "pdf" }),
        );

        // 4. Optional transforms
        let operations = canonical_order(&session.project.operations);
        if !operations.is_empty() {
            session.transition(ProjectStatus::Processing)?;
            session.record(
                STEP_CLOUD_SERVICES,
                format!("Applying {} services", operations.len()),
                Outcome::Info,
                json!({ "services": operations, "input_bytes": pdf.len() }),
            );

            let mut degraded = Vec::new();
            for operation in &operations {
                let outcome = self.transformer.apply(*operation, pdf).await;
                if let Some(ref reason) = outcome.fallback {
                    session.record(
                        STEP_CLOUD_SERVICES,
                        format!("{} unavailable, document passed through", operation),
                        Outcome::Info,
                        json!({ "service": operation, "error": reason }),
                    );
                    degraded.push(*operation);
                }
                pdf = outcome.bytes;
            }

            session.record(
                STEP_CLOUD_SERVICES,
                "Processing Complete",
                Outcome::Success,
                json!({ "services": operations, "degraded": degraded, "size_bytes": pdf.len() }),
            );
        }

        // 5. Signing (simulated)
        session.transition(ProjectStatus::Signing)?;
        let signee = session.project.signee_email.clone();
        session.record(
            STEP_ESIGN,
            format!("Creating Envelope for {}", signee),
            Outcome::Success,
            json!({
                "recipient_id": recipient_id(),
                "note": "Simulated envelope; no signature service is called",
            }),
        );
        tokio::time::sleep(self.signing_delay).await;

        // 6. Archive
        if pdf.is_empty() {
            return Err(PipelineError::EmptyArtifact);
        }
        let artifact = Artifact::pdf(format!("{}.pdf", session.project.id), pdf);
        let metadata = json!({
            "uri": artifact.uri(),
            "size": artifact.size_bytes,
            "sha256": artifact.sha256,
        });
        session.complete(artifact)?;
        session.record(STEP_VAULT, "Artifact Archived", Outcome::Success, metadata);

        Ok(())
    }
}

fn validate(project: &Project) -> Result<(), PipelineError> {
    if project.status() != ProjectStatus::Idle {
        return Err(PipelineError::InvalidProject(format!(
            "project {} is {}, expected IDLE",
            project.id,
            project.status()
        )));
    }
    if project.template_id.trim().is_empty() {
        return Err(PipelineError::InvalidProject("template id is empty".to_string()));
    }
    if project.signee_email.trim().is_empty() {
        return Err(PipelineError::InvalidProject("signee address is empty".to_string()));
    }
    if project.trace_id().is_some() || !project.events().is_empty() || project.output().is_some() {
        return Err(PipelineError::InvalidProject(format!(
            "project {} carries state from an earlier run",
            project.id
        )));
    }
    Ok(())
}

fn recipient_id() -> String {
    let simple = Uuid::new_v4().simple().to_string();
    format!("rec_{}", &simple[..5])
}

/// A project being driven, paired with the observer of its mutations
struct Session<F> {
    project: Project,
    on_update: F,
}

impl<F> Session<F>
where
    F: FnMut(&ProjectPatch),
{
    fn assign_trace_id(&mut self, trace_id: Uuid) {
        self.project.assign_trace_id(trace_id);
        (self.on_update)(&ProjectPatch::trace_id(trace_id));
    }

    fn transition(&mut self, next: ProjectStatus) -> Result<(), InvalidTransition> {
        self.project.transition(next)?;
        info!(status = %next, "Status changed");
        (self.on_update)(&ProjectPatch::status(next));
        Ok(())
    }

    fn complete(&mut self, artifact: Artifact) -> Result<(), InvalidTransition> {
        self.project.complete(artifact.clone())?;
        info!(status = %self.project.status(), "Status changed");
        (self.on_update)(&ProjectPatch::completed(artifact));
        Ok(())
    }

    fn record(&mut self, step: &str, action: impl Into<String>, outcome: Outcome, metadata: Value) {
        let event = self
            .project
            .ledger_mut()
            .record(step, action, outcome, Some(metadata));

        match outcome {
            Outcome::Error => error!(step, action = %event.action, "Audit event"),
            Outcome::Info | Outcome::Success => info!(step, action = %event.action, %outcome, "Audit event"),
        }

        (self.on_update)(&ProjectPatch::events(self.project.ledger().clone()));
    }

    /// Record the failure, move to ERROR and hand the project back
    fn fail(mut self, source: PipelineError) -> PipelineFailure {
        error!(error = %source, "Workflow failed");

        self.record(
            STEP_CRITICAL,
            "Pipeline Failure",
            Outcome::Error,
            json!({ "error": source.to_string() }),
        );
        if self.project.transition(ProjectStatus::Error).is_ok() {
            (self.on_update)(&ProjectPatch::status(ProjectStatus::Error));
        }

        PipelineFailure {
            project: Box::new(self.project),
            source,
        }
    }
}
