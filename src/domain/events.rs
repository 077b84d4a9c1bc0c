//! Audit event types.
//!
//! Every attempted operation in a workflow run is recorded as an immutable
//! event. A project's events are append-only and stored in execution order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Step tag for the orchestrator itself
pub const STEP_ORCHESTRATOR: &str = "ORCHESTRATOR";

/// Step tag for template rendering and HTML to PDF conversion
pub const STEP_DOCGEN: &str = "DOCGEN-API";

/// Step tag for post-processing transforms
pub const STEP_CLOUD_SERVICES: &str = "CLOUD-SERVICES";

/// Step tag for the (simulated) signature envelope
pub const STEP_ESIGN: &str = "ESIGN-API";

/// Step tag for the final archival of the artifact
pub const STEP_VAULT: &str = "VAULT";

/// Step tag for fatal pipeline failures
pub const STEP_CRITICAL: &str = "CRITICAL";

/// A single immutable fact in a project's audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    /// Unique identifier for this event
    pub id: Uuid,

    /// Position in the ledger (0-based, gapless)
    pub sequence: u64,

    /// When this event was recorded
    pub timestamp: DateTime<Utc>,

    /// Acting subsystem (free-form tag, e.g. "DOCGEN-API")
    pub step: String,

    /// Human-readable description of the action
    pub action: String,

    /// Outcome classification
    pub status: Outcome,

    /// Structured detail (payload sizes, remote job ids, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl AuditEvent {
    /// Create a new event stamped with the current time
    pub fn new(
        sequence: u64,
        step: impl Into<String>,
        action: impl Into<String>,
        status: Outcome,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            sequence,
            timestamp: Utc::now(),
            step: step.into(),
            action: action.into(),
            status,
            metadata: None,
        }
    }

    /// Attach structured metadata
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Override the timestamp
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn is_error(&self) -> bool {
        self.status == Outcome::Error
    }
}

/// Outcome classification of an audit event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Info,
    Error,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Info => write!(f, "info"),
            Self::Error => write!(f, "error"),
        }
    }
}
