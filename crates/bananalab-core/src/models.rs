//! Project records persisted by the repository layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A creative-editor project with its design document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    /// Opaque design document, already optimized when written through the API.
    pub design_data: Option<Value>,
    /// Serialized size of `design_data` at the last save.
    pub design_bytes: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Last successful auto-save, if any.
    pub last_saved_at: Option<DateTime<Utc>>,
}

/// Listing row without the design document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: Uuid,
    pub name: String,
    pub design_bytes: i64,
    pub updated_at: DateTime<Utc>,
    pub last_saved_at: Option<DateTime<Utc>>,
}

impl From<&Project> for ProjectSummary {
    fn from(p: &Project) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            design_bytes: p.design_bytes,
            updated_at: p.updated_at,
            last_saved_at: p.last_saved_at,
        }
    }
}

/// Request body for creating a project.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
}

/// Confirmation of a stored design document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedDesign {
    pub project_id: Uuid,
    pub design_bytes: i64,
    pub saved_at: DateTime<Utc>,
}
