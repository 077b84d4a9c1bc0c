//! In-memory stand-in for the cloud PDF service.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use sentinel::adapters::{JobStatus, PdfServiceApi, ServiceError, ServiceResult, WatermarkSettings};

pub const BASE_PDF: &[u8] = b"%PDF-1.7\n1 0 obj << /Type /Catalog >> endobj\n%%EOF\n";

/// Remote primitives that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Upload,
    Convert,
    Watermark,
    Linearize,
    Status,
    Download,
}

#[derive(Debug, Clone)]
enum JobKind {
    Convert,
    Watermark(String),
    Linearize,
}

#[derive(Debug)]
struct Job {
    kind: JobKind,
    input: String,
    polls: u32,
}

#[derive(Debug, Default)]
struct State {
    calls: Vec<String>,
    failing: HashSet<Primitive>,
    failed_jobs: HashSet<&'static str>,
    documents: HashMap<String, Vec<u8>>,
    jobs: HashMap<String, Job>,
    next_id: u32,
}

/// Fake service: conversions produce [`BASE_PDF`], watermark and linearize
/// append a marker line to their input.
#[derive(Debug, Default)]
pub struct FakePdfService {
    state: Mutex<State>,
    /// Status checks answered PENDING before a job succeeds
    pending_polls: u32,
    /// Jobs never finish
    stuck: bool,
}

impl FakePdfService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn failing(self, primitive: Primitive) -> Self {
        self.state.lock().unwrap().failing.insert(primitive);
        self
    }

    /// Jobs of this kind ("convert", "watermark", "linearize") end FAILED
    pub fn failing_job(self, kind: &'static str) -> Self {
        self.state.lock().unwrap().failed_jobs.insert(kind);
        self
    }

    pub fn with_pending_polls(mut self, polls: u32) -> Self {
        self.pending_polls = polls;
        self
    }

    pub fn stuck(mut self) -> Self {
        self.stuck = true;
        self
    }

    /// Every primitive invocation, in order
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    fn enter(&self, call: String, primitive: Primitive) -> ServiceResult<std::sync::MutexGuard<'_, State>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        if state.failing.contains(&primitive) {
            return Err(ServiceError::Remote {
                endpoint: format!("{:?}", primitive).to_lowercase(),
                status: Some(500),
                body: Some("{\"message\":\"boom\"}".to_string()),
                message: "HTTP 500".to_string(),
            });
        }
        Ok(state)
    }

    fn submit(&self, call: String, primitive: Primitive, document_id: &str, kind: JobKind) -> ServiceResult<String> {
        let mut state = self.enter(call, primitive)?;
        state.next_id += 1;
        let job_id = format!("job-{}", state.next_id);
        state.jobs.insert(
            job_id.clone(),
            Job {
                kind,
                input: document_id.to_string(),
                polls: 0,
            },
        );
        Ok(job_id)
    }
}

#[async_trait]
impl PdfServiceApi for FakePdfService {
    fn name(&self) -> &str {
        "fake-pdf"
    }

    async fn upload(&self, bytes: Vec<u8>, filename: &str) -> ServiceResult<String> {
        let mut state = self.enter(format!("upload:{}", filename), Primitive::Upload)?;
        state.next_id += 1;
        let id = format!("doc-{}", state.next_id);
        state.documents.insert(id.clone(), bytes);
        Ok(id)
    }

    async fn submit_conversion(&self, document_id: &str) -> ServiceResult<String> {
        self.submit(format!("convert:{}", document_id), Primitive::Convert, document_id, JobKind::Convert)
    }

    async fn submit_watermark(&self, document_id: &str, settings: &WatermarkSettings) -> ServiceResult<String> {
        self.submit(
            format!("watermark:{}", settings.text),
            Primitive::Watermark,
            document_id,
            JobKind::Watermark(settings.text.clone()),
        )
    }

    async fn submit_linearize(&self, document_id: &str) -> ServiceResult<String> {
        self.submit(format!("linearize:{}", document_id), Primitive::Linearize, document_id, JobKind::Linearize)
    }

    async fn job_status(&self, job_id: &str) -> ServiceResult<JobStatus> {
        let mut guard = self.enter(format!("status:{}", job_id), Primitive::Status)?;
        let state = &mut *guard;
        let job = state.jobs.get_mut(job_id).ok_or_else(|| ServiceError::Remote {
            endpoint: "status".to_string(),
            status: Some(404),
            body: None,
            message: format!("unknown job {}", job_id),
        })?;

        job.polls += 1;
        if self.stuck || job.polls <= self.pending_polls {
            return Ok(JobStatus::Pending {
                status: "PROCESSING".to_string(),
                percent: Some(50.0),
            });
        }

        let kind = match job.kind {
            JobKind::Convert => "convert",
            JobKind::Watermark(_) => "watermark",
            JobKind::Linearize => "linearize",
        };
        if state.failed_jobs.contains(kind) {
            return Ok(JobStatus::Failed {
                payload: json!({ "status": "FAILED", "error": format!("{} rejected", kind) }),
            });
        }

        let input = state.documents.get(&job.input).cloned().unwrap_or_default();
        let output = match &job.kind {
            JobKind::Convert => BASE_PDF.to_vec(),
            JobKind::Watermark(text) => [input, format!("%WATERMARK {}\n", text).into_bytes()].concat(),
            JobKind::Linearize => [input, b"%LINEARIZED\n".to_vec()].concat(),
        };

        state.next_id += 1;
        let result_id = format!("doc-{}", state.next_id);
        state.documents.insert(result_id.clone(), output);
        Ok(JobStatus::Succeeded {
            result_document_id: result_id,
        })
    }

    async fn download(&self, document_id: &str) -> ServiceResult<Vec<u8>> {
        let state = self.enter(format!("download:{}", document_id), Primitive::Download)?;
        state.documents.get(document_id).cloned().ok_or_else(|| ServiceError::Remote {
            endpoint: "download".to_string(),
            status: Some(404),
            body: None,
            message: format!("unknown document {}", document_id),
        })
    }
}
