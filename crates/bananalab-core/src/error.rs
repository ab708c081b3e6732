//! Error types for the BananaLab backend.

use thiserror::Error;

/// Result type alias using BananaLab's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for BananaLab operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Project not found
    #[error("Project not found: {0}")]
    ProjectNotFound(uuid::Uuid),

    /// Design document could not be interpreted
    #[error("Invalid design document: {0}")]
    InvalidDesign(#[from] DesignParseError),

    /// Design document is still over the packet budget after optimization
    #[error("Payload too large: {size_bytes} bytes exceeds limit of {limit_bytes} bytes")]
    PayloadTooLarge { size_bytes: usize, limit_bytes: usize },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

/// Structural problems found while parsing a design document.
///
/// Only the top-level shape is validated strictly. Malformed sub-trees
/// (a page that is not an object, `elements` that is not an array, ...) are
/// kept verbatim and skipped, never reported here.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DesignParseError {
    /// The document root is not a JSON object
    #[error("design document must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// The document could not be read into the typed model
    #[error("design document is malformed: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_error_display_project_not_found() {
        let id = Uuid::nil();
        let err = Error::ProjectNotFound(id);
        assert_eq!(err.to_string(), format!("Project not found: {}", id));
    }

    #[test]
    fn test_error_display_payload_too_large() {
        let err = Error::PayloadTooLarge {
            size_bytes: 900_000,
            limit_bytes: 838_861,
        };
        assert_eq!(
            err.to_string(),
            "Payload too large: 900000 bytes exceeds limit of 838861 bytes"
        );
    }

    #[test]
    fn test_error_display_invalid_design() {
        let err: Error = DesignParseError::NotAnObject("array").into();
        assert_eq!(
            err.to_string(),
            "Invalid design document: design document must be a JSON object, got array"
        );
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
