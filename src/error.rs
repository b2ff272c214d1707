//! Error types for the query layer
//!
//! Provides the closed error-kind taxonomy produced at the backend boundary and
//! the unified `QueryError` used across cache, breaker, retry and façade.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

// == Error Kind ==
/// Classification of a backend failure, decided by the collaborator that
/// talked to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Connectivity failure, aborted request, gateway unavailable
    Network,
    /// Backend asked us to slow down
    Throttled,
    /// Authentication or authorization rejected
    PermissionDenied,
    /// Requested entity does not exist
    NotFound,
    /// Anything the boundary could not classify
    Unknown,
}

impl ErrorKind {
    /// Returns true for network-class errors that are worth retrying.
    pub fn is_transient(self) -> bool {
        matches!(self, ErrorKind::Network | ErrorKind::Throttled)
    }
}

// == Query Error Enum ==
/// Unified error type for query execution.
///
/// Cloneable so every caller joined on a de-duplicated fetch receives the
/// same rejection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The backend (or the transport to it) reported a failure
    #[error("Backend error ({kind:?}): {message}")]
    Backend { kind: ErrorKind, message: String },

    /// The circuit breaker rejected the call without trying the backend
    #[error("Circuit open: retry in {retry_after_ms}ms")]
    CircuitOpen { retry_after_ms: u64 },

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Internal error (task failure, poisoned state)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl QueryError {
    /// Builds a backend error of the given kind.
    pub fn backend(kind: ErrorKind, message: impl Into<String>) -> Self {
        QueryError::Backend {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a network-class backend error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::backend(ErrorKind::Network, message)
    }

    /// Returns the backend error kind, if this is a backend error.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            QueryError::Backend { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Returns true if retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        self.kind().is_some_and(ErrorKind::is_transient)
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for QueryError {
    fn into_response(self) -> Response {
        let status = match &self {
            QueryError::Backend { kind, .. } => match kind {
                ErrorKind::Network | ErrorKind::Unknown => StatusCode::BAD_GATEWAY,
                ErrorKind::Throttled => StatusCode::TOO_MANY_REQUESTS,
                ErrorKind::PermissionDenied => StatusCode::FORBIDDEN,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
            },
            QueryError::CircuitOpen { .. } => StatusCode::SERVICE_UNAVAILABLE,
            QueryError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            QueryError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match &self {
            QueryError::CircuitOpen { retry_after_ms } => json!({
                "error": self.to_string(),
                "retry_after_ms": retry_after_ms,
            }),
            QueryError::Backend { kind, .. } => json!({
                "error": self.to_string(),
                "kind": kind,
            }),
            _ => json!({ "error": self.to_string() }),
        };

        (status, Json(body)).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for query operations.
pub type Result<T> = std::result::Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_kinds() {
        assert!(ErrorKind::Network.is_transient());
        assert!(ErrorKind::Throttled.is_transient());
        assert!(!ErrorKind::PermissionDenied.is_transient());
        assert!(!ErrorKind::NotFound.is_transient());
        assert!(!ErrorKind::Unknown.is_transient());
    }

    #[test]
    fn test_non_backend_errors_are_not_transient() {
        assert!(!QueryError::CircuitOpen { retry_after_ms: 10 }.is_transient());
        assert!(!QueryError::Internal("boom".into()).is_transient());
        assert_eq!(QueryError::Internal("boom".into()).kind(), None);
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (QueryError::network("down"), StatusCode::BAD_GATEWAY),
            (
                QueryError::backend(ErrorKind::Throttled, "slow down"),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                QueryError::backend(ErrorKind::PermissionDenied, "rls"),
                StatusCode::FORBIDDEN,
            ),
            (
                QueryError::backend(ErrorKind::NotFound, "gone"),
                StatusCode::NOT_FOUND,
            ),
            (
                QueryError::CircuitOpen { retry_after_ms: 5 },
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                QueryError::InvalidRequest("bad".into()),
                StatusCode::BAD_REQUEST,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }
}
