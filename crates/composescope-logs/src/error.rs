//! Error types for log retrieval.

use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by a log backend.
///
/// Consumers and the service filter never produce errors of their own; every
/// variant here originates in the backend and reaches the caller unchanged.
#[derive(Debug, Error)]
pub enum LogError {
    /// No running containers belong to the project.
    #[error("project not found: {0}")]
    ProjectNotFound(String),

    /// The backend failed to list or stream logs.
    #[error("log backend error: {message}")]
    Backend {
        message: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl LogError {
    /// Wrap a backend failure with a short description of what was attempted.
    pub fn backend(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Backend {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Result type alias for log operations.
pub type Result<T> = std::result::Result<T, LogError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_error_display_messages() {
        let err = LogError::ProjectNotFound("shop".to_string());
        assert_eq!(err.to_string(), "project not found: shop");

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = LogError::backend("failed to stream pod web-0", io);
        assert_eq!(err.to_string(), "log backend error: failed to stream pod web-0");
        assert!(err.source().is_some());
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<LogError>();
    }
}
