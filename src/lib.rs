//! Project Cache - scope-aware query layer for a slow, unreliable backend
//!
//! Serves recent results from a TTL cache tagged by project, collapses
//! concurrent identical requests, stops calling a failing backend with a
//! circuit breaker, and retries network failures with fallback data.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod models;
pub mod resilience;
pub mod service;
pub mod tasks;
pub mod upstream;

pub use api::AppState;
pub use config::Config;
pub use error::{ErrorKind, QueryError};
pub use service::{QueryOptions, QueryOutcome, QueryService, RefreshEvent};
pub use tasks::spawn_cleanup_task;
