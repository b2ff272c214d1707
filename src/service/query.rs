//! Per-query options and results.

use serde::Serialize;

use crate::resilience::RetryPolicy;

// == Query Options ==
#[derive(Debug, Clone)]
pub struct QueryOptions<V> {
    /// Returned as degraded data when the backend cannot be reached
    pub fallback: Option<V>,
    /// Overrides the service's retry policy for this query
    pub retry: Option<RetryPolicy>,
    /// Skip the cache lookup (the result is still cached)
    pub bypass_cache: bool,
}

impl<V> Default for QueryOptions<V> {
    fn default() -> Self {
        Self {
            fallback: None,
            retry: None,
            bypass_cache: false,
        }
    }
}

impl<V> QueryOptions<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fallback(mut self, value: V) -> Self {
        self.fallback = Some(value);
        self
    }

    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub fn bypass_cache(mut self) -> Self {
        self.bypass_cache = true;
        self
    }
}

// == Query Outcome ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    /// Network-class failures used up every attempt
    RetriesExhausted,
    /// The circuit breaker refused to try
    CircuitOpen,
}

/// Where a query result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Origin {
    Cache,
    Backend { attempts: u32 },
    Fallback { reason: FallbackReason },
}

/// Value returned by a query together with its origin.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome<V> {
    pub value: V,
    pub origin: Origin,
}

impl<V> QueryOutcome<V> {
    pub fn cached(value: V) -> Self {
        Self {
            value,
            origin: Origin::Cache,
        }
    }

    pub fn fetched(value: V, attempts: u32) -> Self {
        Self {
            value,
            origin: Origin::Backend { attempts },
        }
    }

    pub fn fallback(value: V, reason: FallbackReason) -> Self {
        Self {
            value,
            origin: Origin::Fallback { reason },
        }
    }

    /// True when the value is caller-supplied fallback data rather than a
    /// backend answer.
    pub fn is_degraded(&self) -> bool {
        matches!(self.origin, Origin::Fallback { .. })
    }

    pub fn into_value(self) -> V {
        self.value
    }
}
