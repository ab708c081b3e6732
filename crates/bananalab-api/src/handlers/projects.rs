//! Project and design save handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use bananalab_core::defaults::PAGE_LIMIT;
use bananalab_core::{CreateProjectRequest, OptimizationReport, Project, ProjectSummary};

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListProjectsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct SaveDesignRequest {
    /// The design document, as an object or a JSON-encoded string.
    pub design_data: Value,
}

#[derive(Debug, Serialize)]
pub struct SaveDesignResponse {
    pub success: bool,
    pub message: String,
    pub saved_at: DateTime<Utc>,
    pub design_bytes: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optimization: Option<OptimizationReport>,
}

pub async fn create_project(
    State(state): State<AppState>,
    Json(body): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>), ApiError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Project name is required".into()));
    }

    let project = state.projects.create(name).await?;
    info!(project_id = %project.id, "Project created");
    Ok((StatusCode::CREATED, Json(project)))
}

pub async fn list_projects(
    State(state): State<AppState>,
    Query(query): Query<ListProjectsQuery>,
) -> Result<Json<Vec<ProjectSummary>>, ApiError> {
    let limit = query.limit.unwrap_or(PAGE_LIMIT).max(1);
    Ok(Json(state.projects.list(limit).await?))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Project>, ApiError> {
    state
        .projects
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Project {} not found", id)))
}

pub async fn save_progress(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    report: Option<Extension<OptimizationReport>>,
    Json(body): Json<SaveDesignRequest>,
) -> Result<Json<SaveDesignResponse>, ApiError> {
    save_design(&state, id, report, body, "Progress saved").await
}

pub async fn auto_save(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    report: Option<Extension<OptimizationReport>>,
    Json(body): Json<SaveDesignRequest>,
) -> Result<Json<SaveDesignResponse>, ApiError> {
    save_design(&state, id, report, body, "Auto-saved").await
}

async fn save_design(
    state: &AppState,
    id: Uuid,
    report: Option<Extension<OptimizationReport>>,
    body: SaveDesignRequest,
    message: &str,
) -> Result<Json<SaveDesignResponse>, ApiError> {
    let design = match body.design_data {
        Value::String(raw) => serde_json::from_str(&raw)
            .map_err(|e| ApiError::BadRequest(format!("design_data is not valid JSON: {}", e)))?,
        other => other,
    };

    let saved = state.projects.save_design(id, &design).await?;
    info!(
        project_id = %id,
        design_bytes = saved.design_bytes,
        "Design saved"
    );

    Ok(Json(SaveDesignResponse {
        success: true,
        message: message.to_string(),
        saved_at: saved.saved_at,
        design_bytes: saved.design_bytes,
        optimization: report.map(|Extension(r)| r).filter(|r| r.changed()),
    }))
}
