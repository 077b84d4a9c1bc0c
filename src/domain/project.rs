//! Project state and its lifecycle state machine.
//!
//! A Project is the unit of work for one workflow run. It is mutated only by
//! the orchestrator driving it; observers keep their own copy in sync by
//! merging [`ProjectPatch`]es.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::artifact::Artifact;
use super::events::AuditEvent;
use super::ledger::AuditLedger;
use super::operations::TransformOp;

/// A document workflow project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "ProjectRecord")]
pub struct Project {
    /// Unique identifier for this project (e.g. "FX-7QK2M")
    pub id: String,

    /// Display name
    pub name: String,

    /// Template to render
    pub template_id: String,

    /// Field values for the template
    #[serde(rename = "data")]
    pub fields: BTreeMap<String, String>,

    /// Selected post-processing operations
    #[serde(rename = "appliedServices")]
    pub operations: Vec<TransformOp>,

    /// Recipient of the signature envelope
    pub signee_email: String,

    status: ProjectStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    trace_id: Option<Uuid>,

    #[serde(default)]
    events: AuditLedger,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    output: Option<Artifact>,
}

impl Project {
    /// Create a new project in the IDLE state
    pub fn new(
        name: impl Into<String>,
        template_id: impl Into<String>,
        fields: BTreeMap<String, String>,
        operations: Vec<TransformOp>,
        signee_email: impl Into<String>,
    ) -> Self {
        Self {
            id: generate_project_id(),
            name: name.into(),
            template_id: template_id.into(),
            fields,
            operations,
            signee_email: signee_email.into(),
            status: ProjectStatus::Idle,
            trace_id: None,
            events: AuditLedger::new(),
            output: None,
        }
    }

    pub fn status(&self) -> ProjectStatus {
        self.status
    }

    pub fn trace_id(&self) -> Option<Uuid> {
        self.trace_id
    }

    pub fn events(&self) -> &[AuditEvent] {
        self.events.events()
    }

    pub fn ledger(&self) -> &AuditLedger {
        &self.events
    }

    /// Final artifact; present iff the project is COMPLETED
    pub fn output(&self) -> Option<&Artifact> {
        self.output.as_ref()
    }

    /// Reference to the final artifact; present iff the project is COMPLETED
    pub fn output_url(&self) -> Option<String> {
        self.output.as_ref().map(Artifact::uri)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether a watermark operation was selected
    pub fn has_watermark(&self) -> bool {
        self.operations.contains(&TransformOp::Watermark)
    }

    /// Move to `next`, rejecting transitions outside the table.
    ///
    /// Entering ERROR clears any output so the COMPLETED-iff-output
    /// invariant cannot be broken.
    pub fn transition(&mut self, next: ProjectStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        if next == ProjectStatus::Error {
            self.output = None;
        }
        self.status = next;
        Ok(())
    }

    /// Seal the project as COMPLETED with its final artifact
    pub fn complete(&mut self, artifact: Artifact) -> Result<(), InvalidTransition> {
        self.transition(ProjectStatus::Completed)?;
        self.output = Some(artifact);
        Ok(())
    }

    pub(crate) fn assign_trace_id(&mut self, trace_id: Uuid) {
        self.trace_id = Some(trace_id);
    }

    pub(crate) fn ledger_mut(&mut self) -> &mut AuditLedger {
        &mut self.events
    }

    /// Merge an incremental update into this copy.
    ///
    /// This mirrors state published by the orchestrator; it does not
    /// re-validate transitions.
    pub fn apply_patch(&mut self, patch: &ProjectPatch) {
        if let Some(status) = patch.status {
            self.status = status;
            if status != ProjectStatus::Completed {
                self.output = None;
            }
        }
        if let Some(trace_id) = patch.trace_id {
            self.trace_id = Some(trace_id);
        }
        if let Some(ref events) = patch.events {
            self.events = events.clone();
        }
        if let Some(ref output) = patch.output {
            self.output = Some(output.clone());
        }
    }
}

/// Generate a short human-friendly project id ("FX-" + 5 chars)
fn generate_project_id() -> String {
    let simple = Uuid::new_v4().simple().to_string().to_uppercase();
    format!("FX-{}", &simple[..5])
}

/// Incremental update pushed to observers after every mutation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ProjectStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Uuid>,

    /// Full event list as of this update
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<AuditLedger>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Artifact>,
}

impl ProjectPatch {
    pub fn status(status: ProjectStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn trace_id(trace_id: Uuid) -> Self {
        Self {
            trace_id: Some(trace_id),
            ..Default::default()
        }
    }

    pub fn events(events: AuditLedger) -> Self {
        Self {
            events: Some(events),
            ..Default::default()
        }
    }

    pub fn completed(output: Artifact) -> Self {
        Self {
            status: Some(ProjectStatus::Completed),
            output: Some(output),
            ..Default::default()
        }
    }
}

/// Lifecycle status of a project.
///
/// Progress is totally ordered (IDLE, GENERATING, PROCESSING, SIGNING,
/// COMPLETED); PROCESSING may be skipped, and ERROR is reachable from any
/// non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectStatus {
    Idle,
    Generating,
    Processing,
    Signing,
    Completed,
    Error,
}

impl ProjectStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Transition table
    pub fn can_transition_to(self, next: ProjectStatus) -> bool {
        use ProjectStatus::*;

        match (self, next) {
            (Idle, Generating)
            | (Generating, Processing)
            | (Generating, Signing)
            | (Processing, Signing)
            | (Signing, Completed) => true,
            (from, Error) => !from.is_terminal(),
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Generating => "GENERATING",
            Self::Processing => "PROCESSING",
            Self::Signing => "SIGNING",
            Self::Completed => "COMPLETED",
            Self::Error => "ERROR",
        }
    }
}

impl Default for ProjectStatus {
    fn default() -> Self {
        Self::Idle
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid status transition {from} -> {to}")]
pub struct InvalidTransition {
    pub from: ProjectStatus,
    pub to: ProjectStatus,
}

/// A serialized project whose state does not hold together
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("inconsistent project record: {0}")]
pub struct InvalidProjectRecord(pub String);

/// Wire form of [`Project`], checked before it becomes one
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectRecord {
    id: String,
    name: String,
    template_id: String,
    #[serde(rename = "data", default)]
    fields: BTreeMap<String, String>,
    #[serde(rename = "appliedServices", default)]
    operations: Vec<TransformOp>,
    signee_email: String,
    #[serde(default)]
    status: ProjectStatus,
    #[serde(default)]
    trace_id: Option<Uuid>,
    #[serde(default)]
    events: AuditLedger,
    #[serde(default)]
    output: Option<Artifact>,
}

impl TryFrom<ProjectRecord> for Project {
    type Error = InvalidProjectRecord;

    fn try_from(record: ProjectRecord) -> Result<Self, Self::Error> {
        let completed = record.status == ProjectStatus::Completed;
        if record.output.is_some() != completed {
            return Err(InvalidProjectRecord(format!(
                "output must be present iff COMPLETED (status {})",
                record.status
            )));
        }
        if record.status == ProjectStatus::Idle
            && (record.trace_id.is_some() || !record.events.is_empty())
        {
            return Err(InvalidProjectRecord(
                "IDLE project carries run state".to_string(),
            ));
        }
        if record.status != ProjectStatus::Idle && record.trace_id.is_none() {
            return Err(InvalidProjectRecord(format!(
                "{} project has no trace id",
                record.status
            )));
        }
        if !record.events.is_chronological() {
            return Err(InvalidProjectRecord("events out of order".to_string()));
        }

        Ok(Self {
            id: record.id,
            name: record.name,
            template_id: record.template_id,
            fields: record.fields,
            operations: record.operations,
            signee_email: record.signee_email,
            status: record.status,
            trace_id: record.trace_id,
            events: record.events,
            output: record.output,
        })
    }
}
