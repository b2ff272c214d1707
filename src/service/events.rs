//! Refresh notifications.
//!
//! Views subscribe to learn when the data they show may be stale. Events are
//! pushed on a tokio broadcast channel; slow subscribers lose the oldest
//! events rather than blocking the service.

use serde::Serialize;
use tokio::sync::broadcast;

/// Topic name refresh events are published under.
pub const REFRESH_TOPIC: &str = "project-data-refresh";

/// Default buffer size for the broadcast channel.
const DEFAULT_BUFFER_SIZE: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionResetReason {
    SessionEnded,
    UserAuthenticated,
}

/// Something happened that invalidated cached data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RefreshEvent {
    /// The selected project changed
    ScopeChanged {
        previous: Option<String>,
        current: Option<String>,
        invalidated: usize,
    },
    /// A manual reload dropped cached data
    Forced {
        scope_id: Option<String>,
        invalidated: usize,
    },
    /// The signed-in user changed or signed out
    SessionReset {
        reason: SessionResetReason,
        invalidated: usize,
    },
}

impl RefreshEvent {
    pub fn topic(&self) -> &'static str {
        REFRESH_TOPIC
    }

    /// Number of cache entries dropped by the change.
    pub fn invalidated(&self) -> usize {
        match self {
            RefreshEvent::ScopeChanged { invalidated, .. }
            | RefreshEvent::Forced { invalidated, .. }
            | RefreshEvent::SessionReset { invalidated, .. } => *invalidated,
        }
    }
}

// == Broadcaster ==
#[derive(Debug, Clone)]
pub struct RefreshBroadcaster {
    sender: broadcast::Sender<RefreshEvent>,
}

impl RefreshBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Sends an event to all subscribers.
    ///
    /// Returns the number of subscribers that received it, 0 when nobody listens.
    pub fn send(&self, event: RefreshEvent) -> usize {
        self.sender.send(event).unwrap_or_default()
    }

    /// Receives events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for RefreshBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
