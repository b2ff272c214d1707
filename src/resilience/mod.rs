//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Query for an uncached key:
//!     → circuit_breaker.rs (fail fast while the backend is considered down)
//!     → retry.rs (retry network-class errors, substitute fallback on exhaustion)
//!     → circuit_breaker.rs (account the final success or failure)
//! ```

pub mod circuit_breaker;
pub mod retry;

pub use circuit_breaker::{
    BreakerConfig, BreakerPhase, BreakerSnapshot, CircuitBreaker, CircuitBreakerState,
    FailureClass,
};
pub use retry::{with_retry, RetryOutcome, RetryPolicy};
