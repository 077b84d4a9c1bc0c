//! In-memory archive of finished projects.
//!
//! The archive is bounded; once full, the oldest project is dropped.
//! Listings return [`ProjectSummary`] rows that reference the artifact by
//! URL instead of carrying its bytes.

use std::collections::VecDeque;

use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{Project, ProjectStatus};

pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Listing row for an archived project
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub template_id: String,
    pub status: ProjectStatus,
    pub signee_email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Uuid>,
    pub event_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl From<&Project> for ProjectSummary {
    fn from(project: &Project) -> Self {
        let output = project.output();
        Self {
            id: project.id.clone(),
            name: project.name.clone(),
            template_id: project.template_id.clone(),
            status: project.status(),
            signee_email: project.signee_email.clone(),
            trace_id: project.trace_id(),
            event_count: project.events().len(),
            output_url: project.output_url(),
            size_bytes: output.map(|a| a.size_bytes),
            sha256: output.map(|a| a.sha256.clone()),
        }
    }
}

/// Read-only history of terminal projects for the current session
#[derive(Debug)]
pub struct ProjectHistory {
    projects: RwLock<VecDeque<Project>>,
    capacity: usize,
}

impl Default for ProjectHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl ProjectHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `capacity` projects (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            projects: RwLock::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    /// Archive a finished project. Non-terminal projects are refused.
    pub async fn archive(&self, project: Project) -> bool {
        if !project.is_terminal() {
            return false;
        }
        let mut projects = self.projects.write().await;
        while projects.len() >= self.capacity {
            projects.pop_front();
        }
        projects.push_back(project);
        true
    }

    /// Most recent first
    pub async fn list(&self, limit: usize) -> Vec<ProjectSummary> {
        self.projects
            .read()
            .await
            .iter()
            .rev()
            .take(limit)
            .map(ProjectSummary::from)
            .collect()
    }

    pub async fn find_by_trace(&self, trace_id: Uuid) -> Option<Project> {
        self.projects
            .read()
            .await
            .iter()
            .find(|p| p.trace_id() == Some(trace_id))
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.projects.read().await.len()
    }
}
