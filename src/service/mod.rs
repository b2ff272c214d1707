//! Service Module
//!
//! The query façade, its per-query types and refresh notifications.

pub mod events;
mod facade;
mod query;

pub use events::{RefreshBroadcaster, RefreshEvent, SessionResetReason, REFRESH_TOPIC};
pub use facade::{QueryService, ServiceSettings, ServiceStats};
pub use query::{FallbackReason, Origin, QueryOptions, QueryOutcome};
