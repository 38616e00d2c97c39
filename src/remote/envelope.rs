use std::fmt;

use serde::{Deserialize, Serialize};

use crate::tree::node::Node;

/// Success envelope: every response carries a user-facing message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub status: u16,
    #[serde(default)]
    pub message: String,
    pub data: T,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub timestamp: String,
}

impl<T> ApiResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            status: 200,
            message: message.into(),
            data,
            path: String::new(),
            timestamp: String::new(),
        }
    }
}

impl<T: Default> ApiResponse<Option<T>> {
    /// A `null` or missing `data` becomes the empty value.
    pub fn or_default(self) -> ApiResponse<T> {
        ApiResponse {
            status: self.status,
            message: self.message,
            data: self.data.unwrap_or_default(),
            path: self.path,
            timestamp: self.timestamp,
        }
    }
}

/// Payload of trash and delete responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteResult {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub deleted: bool,
}

/// Failure envelope, passed to callers unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub status: u16,
    pub message: String,
    pub error: String,
    /// Field-level validation details, when the server sends them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub timestamp: String,
}

/// Error body as it may arrive: any field can be missing.
#[derive(Debug, Default, Deserialize)]
struct RawApiError {
    status: Option<u16>,
    message: Option<String>,
    error: Option<String>,
    errors: Option<serde_json::Value>,
    path: Option<String>,
    timestamp: Option<String>,
}

pub const DEFAULT_ERROR_MESSAGE: &str = "An unexpected error occurred";

impl ApiError {
    pub fn new(status: u16, message: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            error: error.into(),
            errors: None,
            path: String::new(),
            timestamp: String::new(),
        }
    }

    /// Decode a non-success body, filling gaps from the HTTP status and request path.
    pub fn from_body(status: u16, body: &str, path: &str) -> Self {
        let raw: RawApiError = serde_json::from_str(body).unwrap_or_default();
        Self {
            status: raw.status.unwrap_or(status),
            message: raw
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string()),
            error: raw.error.unwrap_or_else(|| "ApiError".to_string()),
            errors: raw.errors,
            path: raw.path.unwrap_or_else(|| path.to_string()),
            timestamp: raw.timestamp.unwrap_or_default(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
