//! Response DTOs for the query service API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;
use serde_json::Value;

use crate::service::{Origin, QueryOutcome, ServiceStats};

/// Response body for `GET /query/:entity`
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub entity: String,
    pub scope_id: Option<String>,
    /// Where the data came from
    pub origin: Origin,
    /// True when `data` is fallback data
    pub degraded: bool,
    pub data: Value,
}

impl QueryResponse {
    pub fn new(entity: impl Into<String>, scope_id: Option<String>, outcome: QueryOutcome<Value>) -> Self {
        Self {
            entity: entity.into(),
            scope_id,
            origin: outcome.origin,
            degraded: outcome.is_degraded(),
            data: outcome.value,
        }
    }
}

/// Response body for `PUT /scope`
#[derive(Debug, Clone, Serialize)]
pub struct ScopeResponse {
    /// False when the requested scope was already current
    pub changed: bool,
    pub current_scope: Option<String>,
}

/// Response body for every endpoint that drops cache entries
#[derive(Debug, Clone, Serialize)]
pub struct InvalidationResponse {
    pub message: String,
    /// Number of cache entries removed
    pub invalidated: usize,
}

impl InvalidationResponse {
    pub fn new(message: impl Into<String>, invalidated: usize) -> Self {
        Self {
            message: message.into(),
            invalidated,
        }
    }
}

/// Generic acknowledgement body
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Response body for the stats endpoint (GET /stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    #[serde(flatten)]
    pub stats: ServiceStats,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Time the snapshot was taken, ISO 8601
    pub timestamp: String,
}

impl StatsResponse {
    pub fn new(stats: ServiceStats) -> Self {
        Self {
            hit_rate: stats.cache.hit_rate(),
            stats,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
