//! Error types for the WebFinger server

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use webfinger_store::StoreError;

#[derive(Error, Debug)]
pub enum FingerError {
    #[error("IO error reading {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[source] std::io::Error),

    #[error("Graceful shutdown did not finish within {0:?}")]
    ShutdownTimeout(Duration),
}

pub type Result<T> = std::result::Result<T, FingerError>;

/// A WebFinger query that cannot be answered; ends only the one response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    MissingResource,
    NotFound,
    MethodNotAllowed,
}

impl ProtocolError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProtocolError::MissingResource => StatusCode::BAD_REQUEST,
            ProtocolError::NotFound => StatusCode::NOT_FOUND,
            ProtocolError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            ProtocolError::MissingResource => "resource parameter is required",
            ProtocolError::NotFound => "resource not found",
            ProtocolError::MethodNotAllowed => "method not allowed",
        }
    }
}

impl IntoResponse for ProtocolError {
    fn into_response(self) -> Response {
        (self.status(), axum::Json(json!({ "error": self.message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_display() {
        let err = FingerError::Io {
            path: PathBuf::from("urns.yml"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert_eq!(format!("{}", err), "IO error reading urns.yml: no such file");
    }

    #[test]
    fn test_shutdown_timeout_display() {
        let err = FingerError::ShutdownTimeout(Duration::from_secs(5));
        assert_eq!(
            format!("{}", err),
            "Graceful shutdown did not finish within 5s"
        );
    }

    #[test]
    fn test_protocol_error_status() {
        assert_eq!(
            ProtocolError::MissingResource.into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ProtocolError::NotFound.into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ProtocolError::MethodNotAllowed.into_response().status(),
            StatusCode::METHOD_NOT_ALLOWED
        );
    }
}
