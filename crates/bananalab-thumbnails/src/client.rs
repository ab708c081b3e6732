//! HTTP client for the per-page thumbnail endpoints.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Result, ThumbnailError};

const REQUEST_TIMEOUT_SECS: u64 = 30;

/// A file produced server-side from an uploaded thumbnail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedFile {
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub files: Vec<GeneratedFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileStatus {
    pub name: String,
    pub exists: bool,
    #[serde(default)]
    pub quality: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageStatus {
    pub page_id: String,
    #[serde(default)]
    pub files: Vec<FileStatus>,
}

#[derive(Serialize)]
struct UploadRequest<'a> {
    thumbnail: &'a str,
}

/// Uploads rendered page thumbnails for one project.
#[derive(Clone)]
pub struct ThumbnailClient {
    client: Client,
    base_url: String,
    project_id: String,
}

impl ThumbnailClient {
    /// `base_url` is the thumbnail API root, e.g. `https://host/api/thumbnails`.
    pub fn new(base_url: impl Into<String>, project_id: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            project_id: project_id.into(),
        })
    }

    fn page_url(&self, page_id: &str, action: &str) -> String {
        format!(
            "{}/{}/page/{}/{}",
            self.base_url, self.project_id, page_id, action
        )
    }

    /// Upload a page thumbnail as a data URL.
    pub async fn upload_page(&self, page_id: &str, data_url: &str) -> Result<UploadResponse> {
        let response = self
            .client
            .post(self.page_url(page_id, "single"))
            .json(&UploadRequest {
                thumbnail: data_url,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ThumbnailError::Status { status, body });
        }

        let result: UploadResponse = response.json().await?;
        info!(
            project_id = %self.project_id,
            page_id,
            files = result.files.len(),
            "Thumbnail uploaded"
        );
        Ok(result)
    }

    /// Existence and quality of the files generated for a page.
    pub async fn page_status(&self, page_id: &str) -> Result<PageStatus> {
        let response = self
            .client
            .get(self.page_url(page_id, "status"))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ThumbnailError::Status { status, body });
        }

        let status: PageStatus = response.json().await?;
        debug!(page_id, files = status.files.len(), "Thumbnail status fetched");
        Ok(status)
    }
}
