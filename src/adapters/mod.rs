//! Adapter interfaces for external systems.
//!
//! The cloud PDF service is reached through the [`PdfServiceApi`] trait so
//! the orchestrator can be driven against the real HTTP client or an
//! in-process fake.

pub mod jobs;
pub mod pdf_services;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub use jobs::{convert_html_to_pdf, poll_until_terminal, JobStatus, PollPolicy};
pub use pdf_services::{PdfServicesClient, ServiceSettings};

/// Failures surfaced by the remote service client
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Non-2xx response or network failure on a single call
    #[error("remote call to {endpoint} failed: {message}")]
    Remote {
        endpoint: String,
        status: Option<u16>,
        body: Option<String>,
        message: String,
    },

    /// Response is missing a field under every known alias
    #[error("unexpected response from {endpoint}: missing {expected}")]
    Protocol {
        endpoint: String,
        expected: String,
        body: String,
    },

    /// Job did not reach a terminal state within the attempt budget
    #[error("job {job_id} did not finish after {attempts} status checks")]
    Timeout { job_id: String, attempts: u32 },

    /// Job reached a failure terminal state
    #[error("job {job_id} failed: {payload}")]
    JobFailed { job_id: String, payload: Value },
}

impl ServiceError {
    /// HTTP status of the failed call, if there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => *status,
            _ => None,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Visual parameters for a watermark job
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WatermarkSettings {
    pub text: String,
    pub position: String,
    pub opacity: u8,
    pub rotation: u16,
    pub font_size: u16,
}

impl WatermarkSettings {
    /// Centered, 40% opacity, 45 degree rotation, small font
    pub fn centered(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            position: "center".to_string(),
            opacity: 40,
            rotation: 45,
            font_size: 18,
        }
    }
}

/// Primitive operations offered by the cloud PDF service
#[async_trait]
pub trait PdfServiceApi: Send + Sync {
    /// Human-readable service name
    fn name(&self) -> &str;

    /// Store a raw payload remotely, returning its document id
    async fn upload(&self, bytes: Vec<u8>, filename: &str) -> ServiceResult<String>;

    /// Request an HTML to PDF conversion, returning the job id
    async fn submit_conversion(&self, document_id: &str) -> ServiceResult<String>;

    /// Request a watermark job, returning the job id
    async fn submit_watermark(
        &self,
        document_id: &str,
        settings: &WatermarkSettings,
    ) -> ServiceResult<String>;

    /// Request a linearize job, returning the job id
    async fn submit_linearize(&self, document_id: &str) -> ServiceResult<String>;

    /// Fetch the current status of a job (single request)
    async fn job_status(&self, job_id: &str) -> ServiceResult<JobStatus>;

    /// Fetch a document's raw bytes
    async fn download(&self, document_id: &str) -> ServiceResult<Vec<u8>>;
}
