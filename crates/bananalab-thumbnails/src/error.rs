//! Error types for thumbnail generation and transport.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for thumbnail operations.
pub type Result<T> = std::result::Result<T, ThumbnailError>;

/// Why a page capture did not produce an image.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The capture was cancelled. Not a failure: no fallback, no error record.
    #[error("render cancelled")]
    Cancelled,

    /// The capture exceeded the image-load timeout.
    #[error("render timed out after {0:?}")]
    Timeout(Duration),

    /// The capture finished but returned no image data.
    #[error("render produced no image data")]
    Empty,

    /// The capture failed.
    #[error("render failed: {0}")]
    Failed(String),
}

impl RenderError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RenderError::Cancelled)
    }
}

/// Errors from data URL handling and the thumbnail endpoints.
#[derive(Error, Debug)]
pub enum ThumbnailError {
    /// Value is not a base64 `data:image/...` URL
    #[error("Invalid data URL: {0}")]
    InvalidDataUrl(String),

    /// Raster encoding failed
    #[error("Encode error: {0}")]
    Encode(String),

    /// HTTP request failed
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status
    #[error("Thumbnail endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
}
