//! Repository traits implemented by the storage layer.

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Project, ProjectSummary, SavedDesign};

/// Storage for projects and their design documents.
///
/// The repository owns a design document once `save_design` returns; callers
/// keep only their working copy.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Create an empty project.
    async fn create(&self, name: &str) -> Result<Project>;

    /// Fetch a project with its design document.
    async fn get(&self, id: Uuid) -> Result<Option<Project>>;

    /// List projects, most recently updated first.
    async fn list(&self, limit: i64) -> Result<Vec<ProjectSummary>>;

    /// Replace the design document of an existing project.
    ///
    /// Returns [`crate::Error::ProjectNotFound`] when the project does not exist.
    async fn save_design(&self, id: Uuid, design: &Value) -> Result<SavedDesign>;
}
