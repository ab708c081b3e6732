//! In-memory project repository for tests and local development.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;
use uuid::Uuid;

use bananalab_core::{
    serialized_len, Error, Project, ProjectRepository, ProjectSummary, Result, SavedDesign,
};

/// Project repository backed by a map. Contents are lost on restart.
#[derive(Clone, Default)]
pub struct MemoryProjectRepository {
    projects: Arc<RwLock<HashMap<Uuid, Project>>>,
}

impl MemoryProjectRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectRepository for MemoryProjectRepository {
    async fn create(&self, name: &str) -> Result<Project> {
        let now = Utc::now();
        let project = Project {
            id: Uuid::now_v7(),
            name: name.to_string(),
            design_data: None,
            design_bytes: 0,
            created_at: now,
            updated_at: now,
            last_saved_at: None,
        };
        self.projects
            .write()
            .await
            .insert(project.id, project.clone());
        Ok(project)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Project>> {
        Ok(self.projects.read().await.get(&id).cloned())
    }

    async fn list(&self, limit: i64) -> Result<Vec<ProjectSummary>> {
        let projects = self.projects.read().await;
        let mut summaries: Vec<ProjectSummary> =
            projects.values().map(ProjectSummary::from).collect();
        summaries.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        summaries.truncate(limit.max(0) as usize);
        Ok(summaries)
    }

    async fn save_design(&self, id: Uuid, design: &Value) -> Result<SavedDesign> {
        let design_bytes = serialized_len(design)? as i64;
        let mut projects = self.projects.write().await;
        let project = projects.get_mut(&id).ok_or(Error::ProjectNotFound(id))?;

        let now = Utc::now();
        project.design_data = Some(design.clone());
        project.design_bytes = design_bytes;
        project.updated_at = now;
        project.last_saved_at = Some(now);

        Ok(SavedDesign {
            project_id: id,
            design_bytes,
            saved_at: now,
        })
    }
}
