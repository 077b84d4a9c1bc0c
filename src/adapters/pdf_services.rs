//! HTTP client for the cloud PDF services API.
//!
//! Authentication is two static headers (`client_id`, `client_secret`) sent
//! on every request; there is no token exchange.
//!
//! The API is inconsistent about field names (`jobId` vs `taskId`,
//! `resultDocumentId` vs `outputDocumentId`, `COMPLETED` vs `succeeded`).
//! All of that tolerance lives in the `decode_*` functions below; callers
//! only ever see [`JobStatus`] and plain ids.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::jobs::JobStatus;
use super::{PdfServiceApi, ServiceError, ServiceResult, WatermarkSettings};

const UPLOAD_PATH: &str = "/pdf-services/api/documents/upload";
const HTML_TO_PDF_PATH: &str = "/pdf-services/api/documents/create/pdf-from-html";
const WATERMARK_PATH: &str = "/pdf-services/api/pdf-watermark";
const LINEARIZE_PATH: &str = "/pdf-services/api/documents/optimize/pdf-linearize";

const DOCUMENT_ID_FIELDS: [&str; 1] = ["documentId"];
const JOB_ID_FIELDS: [&str; 2] = ["jobId", "taskId"];
const RESULT_ID_FIELDS: [&str; 2] = ["resultDocumentId", "outputDocumentId"];
const SUCCEEDED_STATES: [&str; 2] = ["COMPLETED", "succeeded"];
const FAILED_STATES: [&str; 2] = ["FAILED", "failed"];

pub const DEFAULT_BASE_URL: &str = "https://na1.fusion.foxit.com";

/// Connection settings for the cloud service
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceSettings {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    /// Per-request timeout in seconds (default: 30)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_request_timeout() -> u64 {
    30
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            client_id: String::new(),
            client_secret: String::new(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

impl ServiceSettings {
    pub fn has_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

/// reqwest-backed implementation of [`PdfServiceApi`]
pub struct PdfServicesClient {
    base_url: String,
    client_id: String,
    client_secret: String,
    client: reqwest::Client,
}

impl PdfServicesClient {
    /// Create a client from settings
    pub fn new(settings: &ServiceSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            client,
        })
    }

    /// Build a full URL for an API path
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("client_id", &self.client_id)
            .header("client_secret", &self.client_secret)
    }

    /// Send a request, turning transport failures and non-2xx responses
    /// into `ServiceError::Remote` with the response body attached
    async fn send(&self, endpoint: &str, request: RequestBuilder) -> ServiceResult<Response> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| transport_error(endpoint, e))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.ok().filter(|b| !b.trim().is_empty());
        let message = match body {
            Some(ref b) => format!("HTTP {}: {}", status, b.trim()),
            None => format!("HTTP {}", status),
        };

        Err(ServiceError::Remote {
            endpoint: endpoint.to_string(),
            status: Some(status.as_u16()),
            body,
            message,
        })
    }

    async fn send_json(&self, endpoint: &str, request: RequestBuilder) -> ServiceResult<Value> {
        let response = self.send(endpoint, request).await?;
        let text = response
            .text()
            .await
            .map_err(|e| transport_error(endpoint, e))?;

        serde_json::from_str(&text).map_err(|_| ServiceError::Protocol {
            endpoint: endpoint.to_string(),
            expected: "JSON body".to_string(),
            body: text,
        })
    }

    async fn submit_job(&self, path: &str, payload: Value) -> ServiceResult<String> {
        let body = self
            .send_json(path, self.client.post(self.url(path)).json(&payload))
            .await?;
        let job_id = decode_job_id(path, &body)?;
        debug!(endpoint = path, %job_id, "Job submitted");
        Ok(job_id)
    }
}

#[async_trait]
impl PdfServiceApi for PdfServicesClient {
    fn name(&self) -> &str {
        "pdf-services"
    }

    async fn upload(&self, bytes: Vec<u8>, filename: &str) -> ServiceResult<String> {
        debug!(filename, size_bytes = bytes.len(), "Uploading document");

        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime_for(filename))
            .map_err(|e| transport_error(UPLOAD_PATH, e))?;
        let form = Form::new().part("file", part);

        let body = self
            .send_json(UPLOAD_PATH, self.client.post(self.url(UPLOAD_PATH)).multipart(form))
            .await?;
        decode_document_id(UPLOAD_PATH, &body)
    }

    async fn submit_conversion(&self, document_id: &str) -> ServiceResult<String> {
        self.submit_job(HTML_TO_PDF_PATH, json!({ "documentId": document_id }))
            .await
    }

    async fn submit_watermark(
        &self,
        document_id: &str,
        settings: &WatermarkSettings,
    ) -> ServiceResult<String> {
        self.submit_job(
            WATERMARK_PATH,
            json!({
                "documentId": document_id,
                "watermarkSettings": settings,
            }),
        )
        .await
    }

    async fn submit_linearize(&self, document_id: &str) -> ServiceResult<String> {
        self.submit_job(
            LINEARIZE_PATH,
            json!({
                "documentId": document_id,
                "optimizationSettings": { "linearize": true },
            }),
        )
        .await
    }

    async fn job_status(&self, job_id: &str) -> ServiceResult<JobStatus> {
        let path = format!("/pdf-services/api/tasks/{}", job_id);
        let body = self.send_json(&path, self.client.get(self.url(&path))).await?;
        decode_job_status(&path, body)
    }

    async fn download(&self, document_id: &str) -> ServiceResult<Vec<u8>> {
        let path = format!("/pdf-services/api/documents/{}/download", document_id);
        let response = self.send(&path, self.client.get(self.url(&path))).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| transport_error(&path, e))?;
        Ok(bytes.to_vec())
    }
}

fn transport_error(endpoint: &str, err: reqwest::Error) -> ServiceError {
    ServiceError::Remote {
        endpoint: endpoint.to_string(),
        status: err.status().map(|s| s.as_u16()),
        body: None,
        message: err.to_string(),
    }
}

fn mime_for(filename: &str) -> &'static str {
    if filename.ends_with(".html") || filename.ends_with(".htm") {
        "text/html"
    } else if filename.ends_with(".pdf") {
        "application/pdf"
    } else {
        "application/octet-stream"
    }
}

/// First non-empty string (or number) found under any of `fields`
fn first_field(body: &Value, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| match body.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn missing(endpoint: &str, fields: &[&str], body: &Value) -> ServiceError {
    ServiceError::Protocol {
        endpoint: endpoint.to_string(),
        expected: fields.join(" or "),
        body: body.to_string(),
    }
}

/// Extract the document id from an upload response
pub fn decode_document_id(endpoint: &str, body: &Value) -> ServiceResult<String> {
    first_field(body, &DOCUMENT_ID_FIELDS).ok_or_else(|| missing(endpoint, &DOCUMENT_ID_FIELDS, body))
}

/// Extract the job id from a submission response (`jobId` or `taskId`)
pub fn decode_job_id(endpoint: &str, body: &Value) -> ServiceResult<String> {
    first_field(body, &JOB_ID_FIELDS).ok_or_else(|| missing(endpoint, &JOB_ID_FIELDS, body))
}

/// Normalize a task status response
pub fn decode_job_status(endpoint: &str, body: Value) -> ServiceResult<JobStatus> {
    let status = match body.get("status").and_then(Value::as_str) {
        Some(status) => status.to_string(),
        None => return Err(missing(endpoint, &["status"], &body)),
    };

    if SUCCEEDED_STATES.contains(&status.as_str()) {
        let result_document_id = first_field(&body, &RESULT_ID_FIELDS)
            .ok_or_else(|| missing(endpoint, &RESULT_ID_FIELDS, &body))?;
        return Ok(JobStatus::Succeeded { result_document_id });
    }

    if FAILED_STATES.contains(&status.as_str()) {
        return Ok(JobStatus::Failed { payload: body });
    }

    let percent = body.get("percent").and_then(Value::as_f64);
    Ok(JobStatus::Pending { status, percent })
}
