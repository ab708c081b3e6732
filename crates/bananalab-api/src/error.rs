//! API error responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use bananalab_core::size_in_mb;

/// Errors returned by handlers and middleware, rendered as
/// `{success: false, message, error_type}`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    /// Design still over the packet budget after optimization.
    #[error(
        "Design is too large to save ({} MB, limit {} MB). Reduce the number or size of images and try again.",
        size_in_mb(*.size_bytes),
        size_in_mb(*.limit_bytes)
    )]
    PayloadTooLarge { size_bytes: usize, limit_bytes: usize },

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "not_found",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::PayloadTooLarge { .. } => "payload_too_large",
            ApiError::Internal(_) => "internal_error",
        }
    }
}

impl From<bananalab_core::Error> for ApiError {
    fn from(err: bananalab_core::Error) -> Self {
        use bananalab_core::Error;

        match err {
            Error::ProjectNotFound(id) => ApiError::NotFound(format!("Project {} not found", id)),
            Error::InvalidDesign(e) => ApiError::BadRequest(e.to_string()),
            Error::PayloadTooLarge {
                size_bytes,
                limit_bytes,
            } => ApiError::PayloadTooLarge {
                size_bytes,
                limit_bytes,
            },
            other => {
                tracing::error!(error = %other, "Request failed");
                ApiError::Internal(other.to_string())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut body = json!({
            "success": false,
            "message": self.to_string(),
            "error_type": self.error_type(),
        });

        if let ApiError::PayloadTooLarge {
            size_bytes,
            limit_bytes,
        } = self
        {
            body["size_mb"] = json!(size_in_mb(size_bytes));
            body["max_size_mb"] = json!(size_in_mb(limit_bytes));
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_too_large_message() {
        let err = ApiError::PayloadTooLarge {
            size_bytes: 1_572_864,
            limit_bytes: 838_861,
        };
        assert_eq!(
            err.to_string(),
            "Design is too large to save (1.5 MB, limit 0.8 MB). Reduce the number or size of images and try again."
        );
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_core_error_mapping() {
        let id = uuid::Uuid::nil();
        let err = ApiError::from(bananalab_core::Error::ProjectNotFound(id));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.error_type(), "not_found");

        let err = ApiError::from(bananalab_core::Error::Serialization("boom".into()));
        assert_eq!(err.error_type(), "internal_error");
    }
}
