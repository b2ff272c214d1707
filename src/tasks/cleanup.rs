//! Expired Entry Cleanup Task
//!
//! Background task that periodically purges cache entries past their TTL,
//! so results nobody asks for again do not linger until the next sign-out.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::service::QueryService;

/// Spawns a background task that periodically purges expired cache entries.
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during graceful shutdown.
///
/// # Example
/// ```ignore
/// let service = QueryService::<serde_json::Value>::from_config(&config);
/// let cleanup_handle = spawn_cleanup_task(service.clone(), 60);
/// // Later, during shutdown:
/// cleanup_handle.abort();
/// ```
pub fn spawn_cleanup_task<V>(service: QueryService<V>, cleanup_interval_secs: u64) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
{
    spawn_cleanup_every(service, Duration::from_secs(cleanup_interval_secs))
}

/// Same as [`spawn_cleanup_task`] with an arbitrary interval.
pub fn spawn_cleanup_every<V>(service: QueryService<V>, interval: Duration) -> JoinHandle<()>
where
    V: Clone + Send + Sync + 'static,
{
    tokio::spawn(async move {
        info!(
            interval_ms = interval.as_millis() as u64,
            "starting cache cleanup task"
        );

        loop {
            tokio::time::sleep(interval).await;

            let removed = service.purge_expired().await;
            if removed > 0 {
                info!("cache cleanup: removed {} expired entries", removed);
            } else {
                debug!("cache cleanup: no expired entries found");
            }
        }
    })
}
