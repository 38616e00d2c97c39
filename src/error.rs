use thiserror::Error;

use crate::remote::ApiError;

/// Application-wide result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// I/O errors from local files (uploads, config, log file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Terminal initialization or rendering errors.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// No response was received from the tree service.
    #[error("{0}")]
    ServiceUnavailable(String),

    /// The tree service rejected the request.
    #[error("{0}")]
    Api(ApiError),

    /// The local node graph violates a structural invariant (e.g. a parent cycle).
    #[error("Invariant violated: {0}")]
    Invariant(String),

    /// Input rejected before reaching the service.
    #[error("{0}")]
    Validation(String),

    /// A move or upload target was rejected by the drop rules.
    #[error("Cannot drop here")]
    InvalidDrop,

    /// Malformed JSON payloads (drag payloads, service bodies).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration problems that prevent startup.
    #[error("Config error: {0}")]
    Config(String),
}

impl AppError {
    /// Whether this error means the service could not be reached at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, AppError::ServiceUnavailable(_))
    }
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        AppError::Api(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let app_err: AppError = io_err.into();
        assert!(matches!(app_err, AppError::Io(_)));
        assert!(app_err.to_string().contains("file not found"));
    }

    #[test]
    fn terminal_error_display() {
        let err = AppError::Terminal("failed to enter raw mode".into());
        assert_eq!(err.to_string(), "Terminal error: failed to enter raw mode");
    }

    #[test]
    fn api_error_displays_server_message() {
        let err: AppError = ApiError::new(404, "Node not found", "NotFound").into();
        assert_eq!(err.to_string(), "Node not found");
        assert!(!err.is_unavailable());
    }

    #[test]
    fn unavailable_is_distinct() {
        let err = AppError::ServiceUnavailable("Server unavailable. Check your connection.".into());
        assert!(err.is_unavailable());
        assert_eq!(err.to_string(), "Server unavailable. Check your connection.");
    }

    #[test]
    fn json_error_conversion() {
        let json_err = serde_json::from_str::<Vec<String>>("not json").unwrap_err();
        let app_err: AppError = json_err.into();
        assert!(matches!(app_err, AppError::Json(_)));
    }
}
