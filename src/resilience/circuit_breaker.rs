//! Circuit breaker for backend protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: backend assumed down, requests fail fast
//! - Half-Open: backoff window elapsed, the next request is let through
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive critical failures >= max_failures
//! Open → Half-Open: base_window * 2^min(failures - max_failures, cap_exponent) elapsed
//! Half-Open → Open: probe fails (window grows)
//! Half-Open → Closed: successes bring failures back under max_failures
//! ```
//!
//! Successes decrement the failure counter by one instead of zeroing it, so a
//! backend that just recovered re-opens quickly if it fails again.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::SharedClock;
use crate::error::{ErrorKind, QueryError, Result};

// == Failure Policy ==
/// Whether a failure counts toward opening the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Counted toward the failure threshold
    Critical,
    /// Logged only
    Recoverable,
}

impl FailureClass {
    /// The single classification policy for breaker accounting.
    ///
    /// Transient kinds only reach the breaker once retries are exhausted, so
    /// they count here. `NotFound` is a normal backend answer, and a circuit
    /// rejection or bad request says nothing about backend health.
    pub fn of(err: &QueryError) -> Self {
        match err {
            QueryError::Backend { kind, .. } => match kind {
                ErrorKind::NotFound => FailureClass::Recoverable,
                ErrorKind::Network
                | ErrorKind::Throttled
                | ErrorKind::PermissionDenied
                | ErrorKind::Unknown => FailureClass::Critical,
            },
            QueryError::CircuitOpen { .. } | QueryError::InvalidRequest(_) => {
                FailureClass::Recoverable
            }
            QueryError::Internal(_) => FailureClass::Critical,
        }
    }
}

// == Configuration ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerConfig {
    /// Consecutive critical failures that open the circuit
    pub max_failures: u32,
    /// Backoff window at the threshold, in milliseconds
    pub base_window_ms: u64,
    /// Cap on the window's doubling exponent
    pub cap_exponent: u32,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            base_window_ms: 30_000,
            cap_exponent: 4,
        }
    }
}

// == State ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerPhase {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CircuitBreakerState {
    pub consecutive_failures: u32,
    pub last_failure_at: Option<u64>,
    pub is_open: bool,
    /// Set while a half-open probe is outstanding
    pub probe_started_at: Option<u64>,
}

/// Point-in-time view of the breaker for stats endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakerSnapshot {
    pub phase: BreakerPhase,
    pub consecutive_failures: u32,
    pub last_failure_at: Option<u64>,
    pub window_ms: u64,
    pub retry_after_ms: u64,
}

// == Circuit Breaker ==
#[derive(Debug)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    state: CircuitBreakerState,
    clock: SharedClock,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig, clock: SharedClock) -> Self {
        Self {
            config,
            state: CircuitBreakerState::default(),
            clock,
        }
    }

    /// Current backoff window in milliseconds. Zero while below the threshold.
    pub fn window_ms(&self) -> u64 {
        let failures = self.state.consecutive_failures;
        if failures < self.config.max_failures {
            return 0;
        }
        let exponent = (failures - self.config.max_failures).min(self.config.cap_exponent);
        self.config
            .base_window_ms
            .saturating_mul(2u64.saturating_pow(exponent))
    }

    fn remaining_ms(&self, now: u64) -> u64 {
        let window = self.window_ms();
        let since = |at: Option<u64>| {
            let elapsed = at.map_or(u64::MAX, |at| now.saturating_sub(at));
            window.saturating_sub(elapsed)
        };
        since(self.state.last_failure_at).max(since(self.state.probe_started_at))
    }

    // == Check ==
    /// Decides whether a call may proceed.
    ///
    /// Returns `CircuitOpen` while the backoff window is running. Once it has
    /// elapsed exactly one call is allowed through as a probe; others are
    /// rejected until the probe is recorded or a further window passes.
    pub fn check(&mut self) -> Result<()> {
        if self.state.consecutive_failures < self.config.max_failures {
            self.state.is_open = false;
            return Ok(());
        }

        let now = self.clock.now_ms();
        let retry_after_ms = self.remaining_ms(now);
        if retry_after_ms > 0 {
            self.state.is_open = true;
            return Err(QueryError::CircuitOpen { retry_after_ms });
        }

        info!(
            failures = self.state.consecutive_failures,
            "circuit half-open, letting probe through"
        );
        self.state.probe_started_at = Some(now);
        self.state.is_open = false;
        Ok(())
    }

    // == Record Success ==
    pub fn record_success(&mut self) {
        let before = self.state.consecutive_failures;
        self.state.consecutive_failures = before.saturating_sub(1);
        self.state.probe_started_at = None;

        if self.state.consecutive_failures < self.config.max_failures {
            self.state.is_open = false;
            if before >= self.config.max_failures {
                info!(
                    failures = self.state.consecutive_failures,
                    "circuit closed after successful probe"
                );
            }
        }
    }

    // == Record Failure ==
    /// Accounts for a failed call according to [`FailureClass::of`].
    pub fn record_failure(&mut self, err: &QueryError) -> FailureClass {
        let class = FailureClass::of(err);
        self.state.probe_started_at = None;
        if class == FailureClass::Recoverable {
            debug!(error = %err, "recoverable failure, breaker unchanged");
            return class;
        }

        let was_open = self.state.consecutive_failures >= self.config.max_failures;
        self.state.consecutive_failures = self.state.consecutive_failures.saturating_add(1);
        self.state.last_failure_at = Some(self.clock.now_ms());

        if self.state.consecutive_failures >= self.config.max_failures {
            self.state.is_open = true;
            if was_open {
                warn!(
                    failures = self.state.consecutive_failures,
                    window_ms = self.window_ms(),
                    "probe failed, circuit stays open"
                );
            } else {
                warn!(
                    failures = self.state.consecutive_failures,
                    window_ms = self.window_ms(),
                    "circuit opened"
                );
            }
        } else {
            debug!(
                failures = self.state.consecutive_failures,
                error = %err,
                "critical failure recorded"
            );
        }
        class
    }

    // == Reset ==
    /// Manual escape hatch: back to Closed with no failure history.
    pub fn reset(&mut self) {
        self.state = CircuitBreakerState::default();
        info!("circuit breaker reset");
    }

    pub fn state(&self) -> &CircuitBreakerState {
        &self.state
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let now = self.clock.now_ms();
        let retry_after_ms = if self.state.consecutive_failures >= self.config.max_failures {
            self.remaining_ms(now)
        } else {
            0
        };
        let phase = if self.state.consecutive_failures < self.config.max_failures {
            BreakerPhase::Closed
        } else if retry_after_ms > 0 {
            BreakerPhase::Open
        } else {
            BreakerPhase::HalfOpen
        };

        BreakerSnapshot {
            phase,
            consecutive_failures: self.state.consecutive_failures,
            last_failure_at: self.state.last_failure_at,
            window_ms: self.window_ms(),
            retry_after_ms,
        }
    }
}
