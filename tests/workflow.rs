//! Workflow Integration Tests
//!
//! Drives the orchestrator end to end against an in-memory PDF service.

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use sentinel::adapters::{PollPolicy, ServiceError};
use sentinel::core::{DocumentRenderer, Orchestrator, PipelineError, Transformer};
use sentinel::domain::{find_template, Outcome, Project, ProjectPatch, ProjectStatus, TransformOp};

use common::{FakePdfService, Primitive, BASE_PDF};

fn nda_project(operations: Vec<TransformOp>) -> Project {
    let template = find_template("NDA").unwrap();
    Project::new(
        "Acme Global NDA",
        template.id,
        template.default_fields(),
        operations,
        "legal@client.com",
    )
}

fn steps(project: &Project) -> Vec<(String, Outcome)> {
    project
        .events()
        .iter()
        .map(|e| (e.step.clone(), e.status))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn test_watermarked_nda_completes_with_full_ledger() {
    let service = FakePdfService::new().arc();
    let orchestrator = Orchestrator::new(service.clone());

    let project = orchestrator
        .run(nda_project(vec![TransformOp::Watermark]), |_| {})
        .await
        .unwrap();

    assert_eq!(project.status(), ProjectStatus::Completed);
    assert!(project.trace_id().is_some());

    let expected = vec![
        ("ORCHESTRATOR".to_string(), Outcome::Info),
        ("DOCGEN-API".to_string(), Outcome::Info),
        ("DOCGEN-API".to_string(), Outcome::Success),
        ("CLOUD-SERVICES".to_string(), Outcome::Info),
        ("CLOUD-SERVICES".to_string(), Outcome::Success),
        ("ESIGN-API".to_string(), Outcome::Success),
        ("VAULT".to_string(), Outcome::Success),
    ];
    assert_eq!(steps(&project), expected);
    assert_eq!(project.events()[0].action, "Workflow Initialized");
    assert_eq!(project.events()[5].action, "Creating Envelope for legal@client.com");
    assert!(project.ledger().is_chronological());

    let trace = project.trace_id().unwrap().to_string();
    assert_eq!(project.events()[0].metadata.as_ref().unwrap()["traceId"], trace.as_str());

    let output = project.output().unwrap();
    assert!(output.looks_like_pdf());
    assert!(String::from_utf8_lossy(&output.bytes).contains("%WATERMARK OFFICIAL COPY ["));
    assert_eq!(project.output_url(), Some(output.uri()));

    // Render uploads HTML, the watermark re-uploads the base PDF
    let calls = service.calls();
    assert_eq!(calls[0], "upload:input.html");
    assert_eq!(service.count("upload:source.pdf"), 1);
    assert_eq!(service.count("linearize:"), 0);
}

#[tokio::test(start_paused = true)]
async fn test_no_operations_skips_processing() {
    let service = FakePdfService::new().arc();
    let orchestrator = Orchestrator::new(service.clone());

    let mut statuses = Vec::new();
    let project = orchestrator
        .run(nda_project(vec![]), |patch| {
            if let Some(status) = patch.status {
                statuses.push(status);
            }
        })
        .await
        .unwrap();

    assert_eq!(project.status(), ProjectStatus::Completed);
    assert_eq!(
        statuses,
        vec![ProjectStatus::Generating, ProjectStatus::Signing, ProjectStatus::Completed]
    );
    assert!(project.events().iter().all(|e| e.step != "CLOUD-SERVICES"));
    assert_eq!(project.events().len(), 5);
    assert_eq!(project.output().unwrap().bytes, BASE_PDF);
}

#[tokio::test(start_paused = true)]
async fn test_operations_run_in_canonical_order() {
    let service = FakePdfService::new().arc();
    let orchestrator = Orchestrator::new(service.clone());

    let project = orchestrator
        .run(
            nda_project(vec![TransformOp::Linearize, TransformOp::Watermark, TransformOp::Linearize]),
            |_| {},
        )
        .await
        .unwrap();

    let submitted: Vec<String> = service
        .calls()
        .into_iter()
        .filter(|c| c.starts_with("watermark:") || c.starts_with("linearize:"))
        .collect();
    assert_eq!(submitted.len(), 2);
    assert!(submitted[0].starts_with("watermark:"));
    assert!(submitted[1].starts_with("linearize:"));

    let body = String::from_utf8_lossy(&project.output().unwrap().bytes).to_string();
    let watermark_at = body.find("%WATERMARK").unwrap();
    let linearize_at = body.find("%LINEARIZED").unwrap();
    assert!(watermark_at < linearize_at);
}

#[tokio::test(start_paused = true)]
async fn test_watermark_failure_passes_document_through() {
    let service = FakePdfService::new().failing(Primitive::Watermark).arc();
    let orchestrator = Orchestrator::new(service);

    let project = orchestrator
        .run(nda_project(vec![TransformOp::Watermark]), |_| {})
        .await
        .unwrap();

    assert_eq!(project.status(), ProjectStatus::Completed);
    assert_eq!(project.output().unwrap().bytes, BASE_PDF);
    assert_eq!(project.ledger().errors().count(), 0);

    let fallback = project
        .events()
        .iter()
        .find(|e| e.action.contains("unavailable"))
        .unwrap();
    assert_eq!(fallback.step, "CLOUD-SERVICES");
    assert_eq!(fallback.status, Outcome::Info);

    let summary = project.events().iter().find(|e| e.action == "Processing Complete").unwrap();
    assert_eq!(summary.metadata.as_ref().unwrap()["degraded"][0], "watermark");
}

#[tokio::test(start_paused = true)]
async fn test_failed_linearize_job_still_completes() {
    let service = FakePdfService::new().failing_job("linearize").arc();
    let orchestrator = Orchestrator::new(service);

    let project = orchestrator
        .run(nda_project(vec![TransformOp::Watermark, TransformOp::Linearize]), |_| {})
        .await
        .unwrap();

    let body = String::from_utf8_lossy(&project.output().unwrap().bytes).to_string();
    assert!(body.contains("%WATERMARK"));
    assert!(!body.contains("%LINEARIZED"));
    assert_eq!(project.status(), ProjectStatus::Completed);
}

#[tokio::test(start_paused = true)]
async fn test_upload_failure_ends_in_error() {
    let service = FakePdfService::new().failing(Primitive::Upload).arc();
    let orchestrator = Orchestrator::new(service.clone());

    let failure = orchestrator
        .run(nda_project(vec![TransformOp::Watermark]), |_| {})
        .await
        .unwrap_err();

    assert!(matches!(failure.source, PipelineError::Service(ServiceError::Remote { .. })));

    let project = failure.project;
    assert_eq!(project.status(), ProjectStatus::Error);
    assert!(project.output_url().is_none());

    let errors: Vec<_> = project.ledger().errors().collect();
    assert_eq!(errors.len(), 1);
    let last = project.ledger().last().unwrap();
    assert_eq!(last.step, "CRITICAL");
    assert_eq!(last.status, Outcome::Error);
    assert!(last.metadata.as_ref().unwrap()["error"].as_str().unwrap().contains("HTTP 500"));

    // Nothing after the failed upload
    assert_eq!(service.calls(), vec!["upload:input.html".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn test_conversion_timeout_after_attempt_budget() {
    let service = FakePdfService::new().stuck().arc();
    let orchestrator = Orchestrator::new(service.clone());

    let started = tokio::time::Instant::now();
    let failure = orchestrator
        .run(nda_project(vec![]), |_| {})
        .await
        .unwrap_err();

    match failure.source {
        PipelineError::Service(ServiceError::Timeout { attempts, .. }) => assert_eq!(attempts, 60),
        other => panic!("expected timeout, got {:?}", other),
    }
    assert_eq!(service.count("status:"), 60);
    assert!(started.elapsed() >= Duration::from_secs(60));
    assert_eq!(failure.project.status(), ProjectStatus::Error);
}

#[tokio::test(start_paused = true)]
async fn test_pending_jobs_are_polled_to_completion() {
    let service = FakePdfService::new().with_pending_polls(3).arc();
    let orchestrator = Orchestrator::new(service.clone());

    let project = orchestrator.run(nda_project(vec![]), |_| {}).await.unwrap();

    assert_eq!(project.status(), ProjectStatus::Completed);
    assert_eq!(service.count("status:"), 4);
}

#[tokio::test(start_paused = true)]
async fn test_observer_patches_mirror_final_project() {
    let service = FakePdfService::new().arc();
    let orchestrator = Orchestrator::new(service);

    let original = nda_project(vec![TransformOp::Linearize]);
    let mut mirror = original.clone();
    let mut patches: Vec<ProjectPatch> = Vec::new();

    let project = orchestrator
        .run(original, |patch| {
            mirror.apply_patch(patch);
            patches.push(patch.clone());
        })
        .await
        .unwrap();

    assert_eq!(mirror.status(), project.status());
    assert_eq!(mirror.trace_id(), project.trace_id());
    assert_eq!(mirror.events(), project.events());
    assert_eq!(mirror.output_url(), project.output_url());

    // Trace id is published before the first event
    let trace_at = patches.iter().position(|p| p.trace_id.is_some()).unwrap();
    let first_event_at = patches.iter().position(|p| p.events.is_some()).unwrap();
    assert!(trace_at < first_event_at);
}

#[tokio::test(start_paused = true)]
async fn test_signing_waits_configured_delay() {
    let service = FakePdfService::new().arc();
    let orchestrator = Orchestrator::new(service).with_signing_delay(Duration::from_secs(5));

    let started = tokio::time::Instant::now();
    orchestrator.run(nda_project(vec![]), |_| {}).await.unwrap();

    // One poll interval for conversion plus the signing delay
    assert!(started.elapsed() >= Duration::from_secs(6));
}

#[tokio::test]
async fn test_non_idle_project_is_rejected_untouched() {
    let service = FakePdfService::new().arc();
    let orchestrator = Orchestrator::new(service.clone());

    let mut project = nda_project(vec![]);
    project.transition(ProjectStatus::Generating).unwrap();

    let failure = orchestrator.run(project, |_| {}).await.unwrap_err();
    assert!(matches!(failure.source, PipelineError::InvalidProject(_)));
    assert_eq!(failure.project.status(), ProjectStatus::Generating);
    assert!(failure.project.events().is_empty());
    assert!(service.calls().is_empty());
}

#[tokio::test]
async fn test_empty_signee_is_rejected() {
    let service = FakePdfService::new().arc();
    let orchestrator = Orchestrator::new(service);

    let project = Project::new("x", "TPL-NDA-V2", BTreeMap::new(), vec![], "");
    let failure = orchestrator.run(project, |_| {}).await.unwrap_err();

    assert!(matches!(failure.source, PipelineError::InvalidProject(_)));
    assert_eq!(failure.project.status(), ProjectStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn test_unknown_template_renders_fallback_document() {
    let service = FakePdfService::new().arc();
    let orchestrator = Orchestrator::new(service);

    let mut fields = BTreeMap::new();
    fields.insert("client".to_string(), "Initech".to_string());
    let project = Project::new("Custom", "TPL-CUSTOM", fields, vec![], "ops@initech.com");

    let project = orchestrator.run(project, |_| {}).await.unwrap();
    assert_eq!(project.status(), ProjectStatus::Completed);
}

struct BrokenRenderer;

impl DocumentRenderer for BrokenRenderer {
    fn render(&self, template_id: &str, _fields: &BTreeMap<String, String>) -> anyhow::Result<String> {
        anyhow::bail!("template {} failed to render", template_id)
    }
}

#[tokio::test]
async fn test_render_failure_ends_in_error() {
    let service = FakePdfService::new().arc();
    let orchestrator = Orchestrator::new(service.clone()).with_renderer(Arc::new(BrokenRenderer));

    let failure = orchestrator
        .run(nda_project(vec![TransformOp::Watermark]), |_| {})
        .await
        .unwrap_err();

    assert!(matches!(failure.source, PipelineError::Render(_)));
    assert_eq!(failure.project.status(), ProjectStatus::Error);
    assert!(failure.project.output_url().is_none());

    let last = failure.project.ledger().last().unwrap();
    assert_eq!(last.step, "CRITICAL");
    assert!(last.metadata.as_ref().unwrap()["error"]
        .as_str()
        .unwrap()
        .contains("failed to render"));
    assert!(service.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_failed_conversion_job_ends_in_error() {
    let service = FakePdfService::new().failing_job("convert").arc();
    let orchestrator = Orchestrator::new(service.clone());

    let failure = orchestrator
        .run(nda_project(vec![TransformOp::Linearize]), |_| {})
        .await
        .unwrap_err();

    match failure.source {
        PipelineError::Service(ServiceError::JobFailed { ref payload, .. }) => {
            assert_eq!(payload["status"], "FAILED");
        }
        ref other => panic!("expected failed job, got {:?}", other),
    }
    assert_eq!(failure.project.status(), ProjectStatus::Error);
    assert_eq!(failure.project.ledger().errors().count(), 1);
    assert_eq!(failure.project.ledger().last().unwrap().step, "CRITICAL");
    assert!(failure.project.events().iter().all(|e| e.step != "CLOUD-SERVICES"));
    assert_eq!(service.count("linearize:"), 0);
}

fn transformer(service: Arc<FakePdfService>) -> Transformer {
    let poll = PollPolicy {
        interval_ms: 1,
        max_attempts: 3,
    };
    Transformer::new(service, poll, "OFFICIAL COPY")
}

#[tokio::test(start_paused = true)]
async fn test_apply_watermark_stamps_label() {
    let service = FakePdfService::new().arc();
    let bytes = transformer(service.clone())
        .apply_watermark(BASE_PDF.to_vec(), "DRAFT")
        .await;

    let body = String::from_utf8_lossy(&bytes).to_string();
    assert!(body.starts_with("%PDF"));
    assert!(body.contains("%WATERMARK DRAFT ["));
    assert_eq!(service.count("watermark:DRAFT ["), 1);
}

#[tokio::test(start_paused = true)]
async fn test_apply_watermark_passes_input_through_on_failure() {
    let service = FakePdfService::new().failing(Primitive::Upload).arc();
    let input = b"%PDF-in".to_vec();

    let bytes = transformer(service).apply_watermark(input.clone(), "DRAFT").await;
    assert_eq!(bytes, input);
}

#[tokio::test(start_paused = true)]
async fn test_linearize_pdf_success_and_fallback() {
    let bytes = transformer(FakePdfService::new().arc())
        .linearize_pdf(BASE_PDF.to_vec())
        .await;
    assert!(String::from_utf8_lossy(&bytes).ends_with("%LINEARIZED\n"));

    let stuck = FakePdfService::new().stuck().arc();
    let bytes = transformer(stuck.clone()).linearize_pdf(BASE_PDF.to_vec()).await;
    assert_eq!(bytes, BASE_PDF);
    assert_eq!(stuck.count("status:"), 3);
}

#[tokio::test]
async fn test_rerunning_a_finished_project_is_rejected() {
    let service = FakePdfService::new().arc();
    let orchestrator = Orchestrator::new(service.clone()).with_signing_delay(Duration::ZERO);
    let orchestrator = orchestrator.with_poll_policy(PollPolicy {
        interval_ms: 1,
        max_attempts: 3,
    });

    let finished = orchestrator.run(nda_project(vec![]), |_| {}).await.unwrap();
    let calls_before = service.calls().len();
    let events_before = finished.events().to_vec();

    let failure = orchestrator.run(finished, |_| {}).await.unwrap_err();
    assert!(matches!(failure.source, PipelineError::InvalidProject(_)));
    assert_eq!(failure.project.events(), events_before.as_slice());
    assert_eq!(service.calls().len(), calls_before);
}

#[test]
fn test_idle_project_with_leftover_state_does_not_deserialize() {
    let template = find_template("NDA").unwrap();
    let base = serde_json::json!({
        "id": "FX-ABCDE",
        "name": "Replayed",
        "templateId": template.id,
        "data": {},
        "appliedServices": [],
        "signeeEmail": "legal@client.com",
        "status": "IDLE",
    });

    let mut with_output = base.clone();
    with_output["output"] = serde_json::to_value(sentinel::domain::Artifact::pdf("x.pdf", BASE_PDF.to_vec())).unwrap();
    assert!(serde_json::from_value::<Project>(with_output).is_err());

    let mut with_events = base.clone();
    with_events["events"] = serde_json::json!([{
        "id": "6f9619ff-8b86-d011-b42d-00cf4fc964ff",
        "sequence": 0,
        "timestamp": "2099-01-01T00:00:00Z",
        "step": "CRITICAL",
        "action": "stale",
        "status": "error"
    }]);
    assert!(serde_json::from_value::<Project>(with_events).is_err());

    let project: Project = serde_json::from_value(base).unwrap();
    assert_eq!(project.status(), ProjectStatus::Idle);
    assert!(project.output_url().is_none());
}
