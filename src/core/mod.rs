//! Core orchestration logic.
//!
//! This module contains:
//! - Orchestrator: drives a project through the workflow
//! - Transformer: best-effort PDF post-processing
//! - DocumentRenderer: template rendering into HTML
//! - ProjectHistory: in-memory archive of finished projects

pub mod history;
pub mod orchestrator;
pub mod renderer;
pub mod transforms;

// Re-export commonly used types
pub use history::{ProjectHistory, ProjectSummary};
pub use orchestrator::{Orchestrator, PipelineError, PipelineFailure};
pub use renderer::{DocumentRenderer, TemplateRenderer, WATERMARK_FLAG};
pub use transforms::{TransformOutcome, Transformer};
