//! Domain types for the agreement engine.
//!
//! This module contains the core data structures:
//! - Project: the unit of work and its lifecycle state machine
//! - AuditEvent / AuditLedger: the ordered audit trail
//! - Artifact: the final binary document handle
//! - TransformOp, Template: catalogs of operations and templates

pub mod artifact;
pub mod events;
pub mod ledger;
pub mod operations;
pub mod project;
pub mod templates;

// Re-export commonly used types
pub use artifact::Artifact;
pub use events::{AuditEvent, Outcome};
pub use ledger::AuditLedger;
pub use operations::{canonical_order, parse_operations, TransformOp, UnknownOperation};
pub use project::{InvalidProjectRecord, InvalidTransition, Project, ProjectPatch, ProjectStatus};
pub use templates::{find_template, Template, TEMPLATES};
