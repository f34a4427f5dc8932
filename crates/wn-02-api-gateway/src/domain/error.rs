//! API Gateway error types.
//!
//! Publish-side failures map to an HTTP status and a plain-text message
//! detailed enough for the publisher to fix the request.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use std::fmt;
use std::io;
use wn_01_subscriptions::SubscriptionError;

/// HTTP-facing error with status code and message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    /// HTTP status code
    pub status: StatusCode,
    /// Error message returned as the response body
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// Missing or wrong `Auth` header
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Unauthorized")
    }

    pub fn empty_body() -> Self {
        Self::new(StatusCode::BAD_REQUEST, "Request body must not be empty")
    }

    pub fn body_too_large(limit: usize) -> Self {
        Self::new(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("Request body must not be larger than {} bytes", limit),
        )
    }

    /// Body stream failed before it was complete
    pub fn unreadable_body(details: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            format!("Request body could not be read ({})", details),
        )
    }

    /// Syntax error at a known position, or truncated input when `position` is `None`
    pub fn malformed_json(position: Option<(usize, usize)>) -> Self {
        let message = match position {
            Some((line, column)) => format!(
                "Request body contains badly-formed JSON (at line {} column {})",
                line, column
            ),
            None => "Request body contains badly-formed JSON".to_string(),
        };
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn invalid_value(details: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            format!("Request body contains an invalid value ({})", details),
        )
    }

    pub fn unknown_field(field: &str) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            format!("Request body contains unknown field `{}`", field),
        )
    }

    pub fn internal(details: impl fmt::Display) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Internal error: {}", details),
        )
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status.as_u16(), self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, self.message).into_response()
    }
}

// Conversions from common error types

impl From<serde_json::Error> for ApiError {
    fn from(e: serde_json::Error) -> Self {
        use serde_json::error::Category;

        match e.classify() {
            Category::Syntax => ApiError::malformed_json(Some((e.line(), e.column()))),
            Category::Eof => ApiError::malformed_json(None),
            Category::Data => match unknown_field_name(&e.to_string()) {
                Some(field) => ApiError::unknown_field(field),
                None => ApiError::invalid_value(e),
            },
            Category::Io => ApiError::internal(e),
        }
    }
}

impl From<SubscriptionError> for ApiError {
    fn from(e: SubscriptionError) -> Self {
        match e {
            SubscriptionError::Unauthorized => ApiError::unauthorized(),
            other => ApiError::internal(other),
        }
    }
}

/// Extract `x` from serde's "unknown field `x`, expected ..." message.
fn unknown_field_name(message: &str) -> Option<&str> {
    let rest = message.strip_prefix("unknown field `")?;
    rest.split('`').next()
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

/// Gateway-level errors (internal use)
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] crate::domain::config::ConfigError),

    /// Server socket bind error
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: io::Error,
    },

    /// Certificate or key could not be loaded
    #[error("failed to load {listener} TLS certificate: {source}")]
    Tls {
        listener: &'static str,
        #[source]
        source: io::Error,
    },

    /// Server terminated with an I/O error
    #[error("server error: {0}")]
    Serve(#[source] io::Error),

    /// Server task panicked or was cancelled
    #[error("server task failed: {0}")]
    Task(String),
}
