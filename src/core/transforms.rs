//! Best-effort PDF post-processing.
//!
//! Watermark and linearize each upload the current PDF, submit a remote job,
//! poll it and download the result. Any failure along the way is logged and
//! absorbed: the caller gets its input bytes back unchanged.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::adapters::{poll_until_terminal, PdfServiceApi, PollPolicy, ServiceResult, WatermarkSettings};
use crate::domain::TransformOp;

/// Result of applying one operation
#[derive(Debug, Clone)]
pub struct TransformOutcome {
    pub operation: TransformOp,

    /// Transformed bytes, or the untouched input on fallback
    pub bytes: Vec<u8>,

    /// Error that caused the fallback, if any
    pub fallback: Option<String>,
}

impl TransformOutcome {
    pub fn is_degraded(&self) -> bool {
        self.fallback.is_some()
    }
}

/// Applies transform operations against the remote service
#[derive(Clone)]
pub struct Transformer {
    service: Arc<dyn PdfServiceApi>,
    poll: PollPolicy,
    watermark_label: String,
}

impl Transformer {
    pub fn new(service: Arc<dyn PdfServiceApi>, poll: PollPolicy, watermark_label: impl Into<String>) -> Self {
        Self {
            service,
            poll,
            watermark_label: watermark_label.into(),
        }
    }

    pub fn watermark_label(&self) -> &str {
        &self.watermark_label
    }

    /// Apply one operation, falling back to `input` on any failure
    pub async fn apply(&self, operation: TransformOp, input: Vec<u8>) -> TransformOutcome {
        let result = match operation {
            TransformOp::Watermark => self.try_watermark(&input, &self.watermark_label).await,
            TransformOp::Linearize => self.try_linearize(&input).await,
        };
        settle(operation, input, result)
    }

    /// Stamp `label` onto the PDF; returns the input unchanged on failure
    pub async fn apply_watermark(&self, input: Vec<u8>, label: &str) -> Vec<u8> {
        let result = self.try_watermark(&input, label).await;
        settle(TransformOp::Watermark, input, result).bytes
    }

    /// Linearize the PDF; returns the input unchanged on failure
    pub async fn linearize_pdf(&self, input: Vec<u8>) -> Vec<u8> {
        self.apply(TransformOp::Linearize, input).await.bytes
    }

    async fn try_watermark(&self, input: &[u8], label: &str) -> ServiceResult<Vec<u8>> {
        let document_id = self.service.upload(input.to_vec(), "source.pdf").await?;
        let settings = WatermarkSettings::centered(unique_label(label, Utc::now().timestamp_millis()));
        let job_id = self.service.submit_watermark(&document_id, &settings).await?;
        let result_id = poll_until_terminal(self.service.as_ref(), &job_id, &self.poll).await?;
        self.service.download(&result_id).await
    }

    async fn try_linearize(&self, input: &[u8]) -> ServiceResult<Vec<u8>> {
        let document_id = self.service.upload(input.to_vec(), "source.pdf").await?;
        let job_id = self.service.submit_linearize(&document_id).await?;
        let result_id = poll_until_terminal(self.service.as_ref(), &job_id, &self.poll).await?;
        self.service.download(&result_id).await
    }
}

/// Keep the transformed bytes, or log the failure and keep `input`
fn settle(operation: TransformOp, input: Vec<u8>, result: ServiceResult<Vec<u8>>) -> TransformOutcome {
    match result {
        Ok(bytes) => {
            info!(%operation, size_bytes = bytes.len(), "Transform applied");
            TransformOutcome {
                operation,
                bytes,
                fallback: None,
            }
        }
        Err(e) => {
            warn!(%operation, error = %e, "Transform failed, keeping original document");
            TransformOutcome {
                operation,
                bytes: input,
                fallback: Some(e.to_string()),
            }
        }
    }
}

/// Append the last four digits of `millis` so identical requests are not
/// served from the remote side's cache
fn unique_label(label: &str, millis: i64) -> String {
    format!("{} [{:04}]", label, millis.rem_euclid(10_000))
}
