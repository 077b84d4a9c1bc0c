//! Remote job tracking.
//!
//! Jobs are never persisted; they are tracked only by the id the service
//! hands back and polled until they reach a terminal state.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use super::{PdfServiceApi, ServiceError, ServiceResult};

/// Normalized job status, independent of the remote field spellings
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus {
    /// Still running
    Pending {
        status: String,
        percent: Option<f64>,
    },

    /// Finished; the result document can be downloaded
    Succeeded { result_document_id: String },

    /// Finished with a failure; carries the raw status payload
    Failed { payload: Value },
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending { .. })
    }
}

/// Fixed-interval polling budget
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    /// Wait before each status request, in milliseconds (default: 1000)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Maximum number of status requests (default: 60)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_interval_ms() -> u64 {
    1000
}
fn default_max_attempts() -> u32 {
    60
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl PollPolicy {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Upper bound on time spent polling one job
    pub fn ceiling(&self) -> Duration {
        Duration::from_millis(self.interval_ms.saturating_mul(u64::from(self.max_attempts)))
    }
}

/// Poll a job until it succeeds, fails, or the attempt budget runs out.
///
/// Sleeps one interval before every status request. Errors from a single
/// status request abort polling immediately.
#[instrument(skip(api, policy), fields(service = api.name()))]
pub async fn poll_until_terminal(
    api: &dyn PdfServiceApi,
    job_id: &str,
    policy: &PollPolicy,
) -> ServiceResult<String> {
    for attempt in 1..=policy.max_attempts {
        tokio::time::sleep(policy.interval()).await;

        match api.job_status(job_id).await? {
            JobStatus::Succeeded { result_document_id } => {
                debug!(attempt, %result_document_id, "Job succeeded");
                return Ok(result_document_id);
            }
            JobStatus::Failed { payload } => {
                return Err(ServiceError::JobFailed {
                    job_id: job_id.to_string(),
                    payload,
                });
            }
            JobStatus::Pending { status, percent } => {
                debug!(attempt, %status, ?percent, "Job still running");
            }
        }
    }

    Err(ServiceError::Timeout {
        job_id: job_id.to_string(),
        attempts: policy.max_attempts,
    })
}

/// Upload an HTML body, convert it to PDF remotely, and download the result
pub async fn convert_html_to_pdf(
    api: &dyn PdfServiceApi,
    html: &str,
    policy: &PollPolicy,
) -> ServiceResult<Vec<u8>> {
    let document_id = api.upload(html.as_bytes().to_vec(), "input.html").await?;
    let job_id = api.submit_conversion(&document_id).await?;
    let result_id = poll_until_terminal(api, &job_id, policy).await?;
    api.download(&result_id).await
}
