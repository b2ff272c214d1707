//! Upstream backend access.
//!
//! The `Backend` trait is the seam between the query service and whatever
//! actually answers queries. `HttpBackend` talks to a REST endpoint and turns
//! transport and status failures into an [`ErrorKind`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use crate::error::{ErrorKind, QueryError, Result};

#[async_trait]
pub trait Backend: Send + Sync {
    /// Fetches the rows of `entity`, restricted to `scope_id` when given.
    async fn fetch(&self, entity: &str, scope_id: Option<&str>) -> Result<Value>;
}

// == Error Classification ==
/// Maps an upstream HTTP status to an error kind.
pub fn classify_status(status: StatusCode) -> ErrorKind {
    match status {
        StatusCode::TOO_MANY_REQUESTS => ErrorKind::Throttled,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ErrorKind::PermissionDenied,
        StatusCode::NOT_FOUND => ErrorKind::NotFound,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT => {
            ErrorKind::Network
        }
        _ => ErrorKind::Unknown,
    }
}

/// Maps a transport-level reqwest failure to an error kind.
pub fn classify_transport(err: &reqwest::Error) -> ErrorKind {
    if let Some(status) = err.status() {
        return classify_status(status);
    }
    if err.is_connect() || err.is_timeout() || err.is_request() || err.is_body() {
        ErrorKind::Network
    } else {
        ErrorKind::Unknown
    }
}

// == HTTP Backend ==
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QueryError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, entity: &str) -> String {
        format!("{}/{}", self.base_url, entity)
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn fetch(&self, entity: &str, scope_id: Option<&str>) -> Result<Value> {
        let mut request = self.client.get(self.url_for(entity));
        if let Some(scope) = scope_id {
            request = request.query(&[("scope_id", scope)]);
        }

        let response = request
            .send()
            .await
            .map_err(|e| QueryError::backend(classify_transport(&e), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(entity, %status, "upstream returned error status");
            return Err(QueryError::backend(
                classify_status(status),
                format!("upstream returned {status}: {body}"),
            ));
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| QueryError::backend(ErrorKind::Unknown, format!("invalid upstream body: {e}")))
    }
}
