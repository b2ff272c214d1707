//! Configuration Module
//!
//! Handles loading and managing service configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::resilience::{BreakerConfig, RetryPolicy};

/// Service configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// Time-to-live of every cache entry, in milliseconds
    pub cache_ttl_ms: u64,
    /// Consecutive critical failures that open the circuit
    pub breaker_max_failures: u32,
    /// Circuit backoff window at the threshold, in milliseconds
    pub breaker_base_window_ms: u64,
    /// Cap on the circuit window's doubling exponent
    pub breaker_cap_exponent: u32,
    /// Attempts per query, including the first
    pub retry_max_attempts: u32,
    /// Linear retry delay unit, in milliseconds
    pub retry_base_delay_ms: u64,
    /// HTTP server port
    pub server_port: u16,
    /// Expired-entry purge interval in seconds
    pub cleanup_interval: u64,
    /// Base URL of the upstream REST backend
    pub upstream_url: String,
    /// Per-request timeout for the upstream client, in milliseconds
    pub upstream_timeout_ms: u64,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `CACHE_TTL_MS` - Cache entry TTL (default: 600000)
    /// - `BREAKER_MAX_FAILURES` - Failures before the circuit opens (default: 5)
    /// - `BREAKER_BASE_WINDOW_MS` - Initial open window (default: 30000)
    /// - `BREAKER_CAP_EXPONENT` - Window doubling cap (default: 4)
    /// - `RETRY_MAX_ATTEMPTS` - Attempts per query (default: 3)
    /// - `RETRY_BASE_DELAY_MS` - Linear retry delay unit (default: 1000)
    /// - `SERVER_PORT` - HTTP server port (default: 3000)
    /// - `CLEANUP_INTERVAL` - Purge frequency in seconds (default: 60)
    /// - `UPSTREAM_URL` - Backend base URL (default: http://127.0.0.1:54321/rest/v1)
    /// - `UPSTREAM_TIMEOUT_MS` - Upstream request timeout (default: 10000)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_ttl_ms: env_or("CACHE_TTL_MS", defaults.cache_ttl_ms),
            breaker_max_failures: env_or("BREAKER_MAX_FAILURES", defaults.breaker_max_failures),
            breaker_base_window_ms: env_or(
                "BREAKER_BASE_WINDOW_MS",
                defaults.breaker_base_window_ms,
            ),
            breaker_cap_exponent: env_or("BREAKER_CAP_EXPONENT", defaults.breaker_cap_exponent),
            retry_max_attempts: env_or("RETRY_MAX_ATTEMPTS", defaults.retry_max_attempts),
            retry_base_delay_ms: env_or("RETRY_BASE_DELAY_MS", defaults.retry_base_delay_ms),
            server_port: env_or("SERVER_PORT", defaults.server_port),
            cleanup_interval: env_or("CLEANUP_INTERVAL", defaults.cleanup_interval),
            upstream_url: env::var("UPSTREAM_URL").unwrap_or(defaults.upstream_url),
            upstream_timeout_ms: env_or("UPSTREAM_TIMEOUT_MS", defaults.upstream_timeout_ms),
        }
    }

    pub fn breaker(&self) -> BreakerConfig {
        BreakerConfig {
            max_failures: self.breaker_max_failures,
            base_window_ms: self.breaker_base_window_ms,
            cap_exponent: self.breaker_cap_exponent,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.retry_max_attempts,
            Duration::from_millis(self.retry_base_delay_ms),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        let breaker = BreakerConfig::default();
        let retry = RetryPolicy::default();
        Self {
            cache_ttl_ms: 600_000,
            breaker_max_failures: breaker.max_failures,
            breaker_base_window_ms: breaker.base_window_ms,
            breaker_cap_exponent: breaker.cap_exponent,
            retry_max_attempts: retry.max_attempts,
            retry_base_delay_ms: u64::try_from(retry.base_delay.as_millis()).unwrap_or(u64::MAX),
            server_port: 3000,
            cleanup_interval: 60,
            upstream_url: "http://127.0.0.1:54321/rest/v1".to_string(),
            upstream_timeout_ms: 10_000,
        }
    }
}
