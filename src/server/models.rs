//! Request and response bodies for the HTTP surface

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::domain::{Outcome, TransformOp};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub template_id: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    #[serde(default)]
    pub services: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub pdf_base64: String,
    #[serde(default)]
    pub services: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRequest {
    pub name: Option<String>,
    pub template_id: String,
    #[serde(default)]
    pub data: BTreeMap<String, String>,
    #[serde(default)]
    pub services: Vec<String>,
    pub signee_email: String,
}

/// Client-side event forwarded for server logging
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRequest {
    pub step: String,
    pub action: String,
    #[serde(default = "default_outcome")]
    pub status: Outcome,
    pub trace_id: Option<Uuid>,
    pub metadata: Option<Value>,
}

fn default_outcome() -> Outcome {
    Outcome::Info
}

#[derive(Debug, Deserialize)]
pub struct ProjectsQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PdfResponse {
    pub pdf_base64: String,
    pub size_bytes: usize,
    /// Operations that fell back to passing the document through
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub degraded: Vec<TransformOp>,
}

impl PdfResponse {
    pub fn new(pdf: &[u8], degraded: Vec<TransformOp>) -> Self {
        Self {
            pdf_base64: BASE64.encode(pdf),
            size_bytes: pdf.len(),
            degraded,
        }
    }
}
