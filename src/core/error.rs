//! Typed error handling for element endpoints
//!
//! Every failure that can happen while answering a request is an
//! [`ApiError`]. Each variant knows its HTTP status and its error code, so the
//! pipeline can turn any failure into the structured error body:
//!
//! ```json
//! { "error": { "code": 404, "message": "No element exists that matches the endpoint criteria" } }
//! ```
//!
//! # Error Categories
//!
//! - [`ConfigError`]: malformed endpoint configuration (deployment bug, 500)
//! - `UnknownInclude` / `CyclicInclude`: bad client-supplied include graph (400)
//! - `NotFound`: single-item request without a match (404)
//! - `MissingIdentity`: linked-resource output without `id`/`type` (500)
//! - `Backend`: query or storage failure (500, cause is logged, never echoed)

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;

use crate::core::element::ElementIdentity;

/// Message returned to clients for failures they did not cause
pub const GENERIC_MESSAGE: &str = "Internal server error";

/// The main error type for the element API
#[derive(Debug, Error)]
pub enum ApiError {
    /// Endpoint configuration is malformed or ambiguous
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A requested include is not exposed by the transformer at that scope
    #[error("Unknown include '{path}'")]
    UnknownInclude { path: String, available: Vec<String> },

    /// An include chain revisited an element already on the resolution path
    #[error("Cyclic include '{path}': {element} is already being resolved")]
    CyclicInclude {
        path: String,
        element: ElementIdentity,
    },

    /// No element matched a single-item request
    #[error("{message}")]
    NotFound { message: String },

    /// The linked-resource serializer could not find an identity field
    #[error("Missing '{field}' on a resource of type '{resource}'")]
    MissingIdentity {
        field: &'static str,
        resource: String,
    },

    /// Query or storage backend failure
    #[error("Backend failure: {0:#}")]
    Backend(anyhow::Error),

    /// Internal failure that should not happen in normal operation
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Error body sent to clients
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

/// Inner part of [`ErrorResponse`]
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Mirrors the HTTP status code
    pub code: u16,
    pub message: String,
}

impl ApiError {
    /// Shortcut for a not-found error with the standard message
    pub fn not_found() -> Self {
        ApiError::NotFound {
            message: "No element exists that matches the endpoint criteria".to_string(),
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::UnknownInclude { .. } => StatusCode::BAD_REQUEST,
            ApiError::CyclicInclude { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::MissingIdentity { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Backend(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error (used in logs)
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Config(e) => e.error_code(),
            ApiError::UnknownInclude { .. } => "UNKNOWN_INCLUDE",
            ApiError::CyclicInclude { .. } => "CYCLIC_INCLUDE",
            ApiError::NotFound { .. } => "NOT_FOUND",
            ApiError::MissingIdentity { .. } => "MISSING_IDENTITY",
            ApiError::Backend(_) => "BACKEND_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether the client caused this error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// Message that is safe to show to the client
    ///
    /// Backend and internal failures are replaced by a generic message.
    pub fn client_message(&self) -> String {
        match self {
            ApiError::Backend(_) | ApiError::Internal(_) => GENERIC_MESSAGE.to_string(),
            other => other.to_string(),
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: ErrorDetail {
                code: self.status_code().as_u16(),
                message: self.client_message(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to endpoint configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to parse a configuration source
    #[error("Failed to parse config{}: {message}", .file.as_ref().map(|f| format!(" file '{}'", f)).unwrap_or_default())]
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Missing required field in configuration
    #[error("Missing required field '{field}' in {context}")]
    MissingField { field: String, context: String },

    /// Invalid value in configuration
    #[error("Invalid value '{value}' for field '{field}': {message}")]
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// A config factory parameter was neither routed nor defaulted
    #[error("Endpoint parameter '{name}' was not supplied and has no default")]
    MissingParameter { name: String },
}

impl ConfigError {
    pub fn error_code(&self) -> &'static str {
        match self {
            ConfigError::ParseError { .. } => "CONFIG_PARSE_ERROR",
            ConfigError::MissingField { .. } => "CONFIG_MISSING_FIELD",
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE",
            ConfigError::MissingParameter { .. } => "CONFIG_MISSING_PARAMETER",
        }
    }

    /// Shortcut for an invalid value error
    pub fn invalid(
        field: impl Into<String>,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            value: value.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::from(ConfigError::MissingParameter {
                name: "slug".to_string()
            })
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::UnknownInclude {
                path: "author".to_string(),
                available: vec![],
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(ApiError::not_found().status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_backend_message_is_generic() {
        let err = ApiError::Backend(anyhow::anyhow!("connection refused to 10.0.0.3"));
        let body = err.to_response();
        assert_eq!(body.error.code, 500);
        assert_eq!(body.error.message, GENERIC_MESSAGE);
        // The cause is still available to logs
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_client_errors_keep_their_message() {
        let err = ApiError::CyclicInclude {
            path: "author.entries".to_string(),
            element: ElementIdentity::new("entry", Uuid::nil()),
        };
        assert!(err.is_client_error());
        assert!(err.client_message().contains("author.entries"));
    }

    #[test]
    fn test_error_body_shape() {
        let value = serde_json::to_value(ApiError::not_found().to_response()).unwrap();
        assert_eq!(value["error"]["code"], 404);
        assert!(value["error"]["message"].is_string());
    }

    #[test]
    fn test_parse_error_display() {
        let err = ConfigError::ParseError {
            file: Some("element-api.yaml".to_string()),
            message: "bad indent".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to parse config file 'element-api.yaml': bad indent"
        );
    }
}
