//! sentinel - Auditable agreement workflow engine
//!
//! Drives a legal document through render, cloud PDF conversion,
//! optional transforms, simulated signing and archival, keeping an
//! ordered audit ledger correlated by a trace id.
//!
//! # Architecture
//!
//! - Every step appends an [`domain::AuditEvent`] to the project's ledger
//! - The project's status only moves forward (IDLE to COMPLETED) or to ERROR
//! - Remote jobs are polled to a terminal state with a bounded budget
//! - Transforms fail open: a failed watermark or linearize passes the
//!   document through unchanged
//!
//! # Modules
//!
//! - `adapters`: Cloud PDF service client and job polling
//! - `core`: Orchestration (Orchestrator, Transformer, renderer, history)
//! - `domain`: Data structures (Project, AuditEvent, AuditLedger, Artifact)
//! - `config`: Config file and environment resolution
//! - `server`: HTTP API
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Run a workflow
//! sentinel run NDA --op watermark --signee legal@client.com --output nda.pdf
//!
//! # Serve the HTTP API
//! sentinel serve --port 3001
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod server;

// Re-export main types at crate root for convenience
pub use adapters::{PdfServiceApi, PdfServicesClient, ServiceError};
pub use core::{Orchestrator, PipelineError, PipelineFailure};
pub use domain::{AuditEvent, AuditLedger, Outcome, Project, ProjectStatus, TransformOp};
