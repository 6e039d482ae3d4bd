//! Error types and HTTP response conversion
//!
//! Every failure the gateway surfaces to a client travels as one of the
//! closed set of [`Error`] kinds and leaves the process as an
//! [`ErrorEnvelope`]. Raw failure detail rides along in a response
//! extension so the normalizer middleware can log it with request context
//! and decide whether the client may see it.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using the gateway error
pub type Result<T> = std::result::Result<T, Error>;

/// Message carried by every normalized failure envelope
pub const GENERIC_ERROR_MESSAGE: &str = "Internal server error";

/// Detail substituted for the raw failure text when debug mode is off
pub const REDACTED_ERROR_DETAIL: &str = "Internal error";

/// Main error type for the gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Failure reported by the external PLC driver
    #[error("PLC error: {0}")]
    Plc(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(Box<axum::http::Error>),

    /// Service cannot currently answer (shutdown in progress, not started)
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Stable kind tag attached to error-level log records
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config",
            Error::Plc(_) => "plc",
            Error::Io(_) => "io",
            Error::Http(_) => "http",
            Error::Unavailable(_) => "unavailable",
            Error::Internal(_) => "internal",
            Error::Other(_) => "other",
        }
    }
}

/// Uniform JSON envelope returned to clients on failure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Always false
    pub success: bool,

    /// Fixed client-facing message
    pub message: String,

    /// Raw failure detail when debug mode is on, redacted otherwise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ErrorEnvelope {
    /// Envelope exposing the raw failure detail
    pub fn with_detail(detail: impl Into<String>) -> Self {
        Self {
            success: false,
            message: GENERIC_ERROR_MESSAGE.to_string(),
            error: Some(detail.into()),
        }
    }

    /// Envelope with the failure detail redacted
    pub fn redacted() -> Self {
        Self {
            success: false,
            message: GENERIC_ERROR_MESSAGE.to_string(),
            error: Some(REDACTED_ERROR_DETAIL.to_string()),
        }
    }
}

/// Raw failure detail carried from the failure site to the normalizer
///
/// Handlers and the panic hook attach this as a response extension; only
/// the normalizer middleware reads it, so the detail never reaches a
/// client unless debug mode says so.
#[derive(Debug, Clone)]
pub struct ErrorDetail {
    /// Stable kind tag, e.g. `plc` or `panic`
    pub kind: &'static str,

    /// Human-readable failure text
    pub detail: String,
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let failure = ErrorDetail {
            kind: self.kind(),
            detail: self.to_string(),
        };

        // Safe even if the normalizer is absent: the body is the redacted
        // envelope, the raw detail only lives in the extension.
        let mut response =
            (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorEnvelope::redacted())).into_response();
        response.extensions_mut().insert(failure);
        response
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl From<axum::http::Error> for Error {
    fn from(err: axum::http::Error) -> Self {
        Error::Http(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_shapes() {
        let redacted = ErrorEnvelope::redacted();
        assert!(!redacted.success);
        assert_eq!(redacted.message, GENERIC_ERROR_MESSAGE);
        assert_eq!(redacted.error.as_deref(), Some(REDACTED_ERROR_DETAIL));

        let detailed = ErrorEnvelope::with_detail("connection refused");
        assert_eq!(detailed.message, GENERIC_ERROR_MESSAGE);
        assert_eq!(detailed.error.as_deref(), Some("connection refused"));
    }

    #[test]
    fn kind_tags_are_stable() {
        assert_eq!(Error::Plc("down".into()).kind(), "plc");
        assert_eq!(Error::Unavailable("stopping".into()).kind(), "unavailable");
        assert_eq!(Error::Internal("boom".into()).kind(), "internal");
        assert_eq!(Error::Other("misc".into()).kind(), "other");
    }

    #[test]
    fn error_response_carries_detail_extension() {
        let response = Error::Internal("boom".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let failure = response
            .extensions()
            .get::<ErrorDetail>()
            .expect("detail extension");
        assert_eq!(failure.kind, "internal");
        assert!(failure.detail.contains("boom"));
    }
}
