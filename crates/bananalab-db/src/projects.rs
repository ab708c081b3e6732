//! PostgreSQL project repository.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{Pool, Postgres, Row};
use tracing::debug;
use uuid::Uuid;

use bananalab_core::{
    serialized_len, Error, Project, ProjectRepository, ProjectSummary, Result, SavedDesign,
};

/// PostgreSQL project repository.
#[derive(Clone)]
pub struct PgProjectRepository {
    pool: Pool<Postgres>,
}

impl PgProjectRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    fn parse_row(row: &PgRow) -> Result<Project> {
        Ok(Project {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            design_data: row.try_get("design_data")?,
            design_bytes: row.try_get("design_bytes")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            last_saved_at: row.try_get("last_saved_at")?,
        })
    }
}

#[async_trait]
impl ProjectRepository for PgProjectRepository {
    async fn create(&self, name: &str) -> Result<Project> {
        let id = Uuid::now_v7();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO bananalab_project (id, name, design_bytes, created_at, updated_at)
             VALUES ($1, $2, 0, $3, $3)",
        )
        .bind(id)
        .bind(name)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(Project {
            id,
            name: name.to_string(),
            design_data: None,
            design_bytes: 0,
            created_at: now,
            updated_at: now,
            last_saved_at: None,
        })
    }

    async fn get(&self, id: Uuid) -> Result<Option<Project>> {
        let row = sqlx::query(
            "SELECT id, name, design_data, design_bytes, created_at, updated_at, last_saved_at
             FROM bananalab_project WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(Self::parse_row).transpose()
    }

    async fn list(&self, limit: i64) -> Result<Vec<ProjectSummary>> {
        let rows = sqlx::query(
            "SELECT id, name, design_bytes, updated_at, last_saved_at
             FROM bananalab_project ORDER BY updated_at DESC LIMIT $1",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter()
            .map(|r| {
                Ok(ProjectSummary {
                    id: r.try_get("id")?,
                    name: r.try_get("name")?,
                    design_bytes: r.try_get("design_bytes")?,
                    updated_at: r.try_get("updated_at")?,
                    last_saved_at: r.try_get("last_saved_at")?,
                })
            })
            .collect()
    }

    async fn save_design(&self, id: Uuid, design: &Value) -> Result<SavedDesign> {
        let design_bytes = serialized_len(design)? as i64;
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE bananalab_project
             SET design_data = $1, design_bytes = $2, updated_at = $3, last_saved_at = $3
             WHERE id = $4",
        )
        .bind(design)
        .bind(design_bytes)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::ProjectNotFound(id));
        }

        debug!(project_id = %id, design_bytes, "Design document stored");
        Ok(SavedDesign {
            project_id: id,
            design_bytes,
            saved_at: now,
        })
    }
}
