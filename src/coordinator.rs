//! Request Coordinator
//!
//! Collapses concurrent fetches for the same key into one underlying call.
//! The fetch runs on its own task, so callers that stop waiting do not cancel
//! it, and its registration is dropped as soon as it settles.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::error::{QueryError, Result};

type SharedFetch<T> = Shared<BoxFuture<'static, Result<T>>>;

struct Pending<T> {
    generation: u64,
    fetch: SharedFetch<T>,
}

struct Registry<T> {
    pending: HashMap<String, Pending<T>>,
    next_generation: u64,
}

// == Request Coordinator ==
/// In-flight de-duplication keyed by cache key.
pub struct RequestCoordinator<T> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T> Clone for RequestCoordinator<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T> Default for RequestCoordinator<T> {
    fn default() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                pending: HashMap::new(),
                next_generation: 0,
            })),
        }
    }
}

impl<T> std::fmt::Debug for RequestCoordinator<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestCoordinator").finish_non_exhaustive()
    }
}

impl<T> RequestCoordinator<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    // == Fetch Once ==
    /// Joins the pending fetch for `key`, or starts one with `producer`.
    ///
    /// `producer` is only invoked when nothing is pending for `key`. Every
    /// caller, joined or not, receives a clone of the same result.
    pub async fn fetch_once_for<P, Fut>(&self, key: &str, producer: P) -> Result<T>
    where
        P: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let fetch = {
            let mut registry = self.registry.lock().await;

            if let Some(pending) = registry.pending.get(key) {
                debug!(key, "joining in-flight request");
                pending.fetch.clone()
            } else {
                let generation = registry.next_generation;
                registry.next_generation += 1;

                let work = producer();
                let registry_handle = Arc::clone(&self.registry);
                let owned_key = key.to_string();
                let handle = tokio::spawn(async move {
                    let result = work.await;
                    let mut registry = registry_handle.lock().await;
                    let ours = registry
                        .pending
                        .get(&owned_key)
                        .is_some_and(|p| p.generation == generation);
                    if ours {
                        registry.pending.remove(&owned_key);
                    }
                    result
                });

                let fetch = async move {
                    handle.await.unwrap_or_else(|join_err| {
                        error!(error = %join_err, "in-flight request task failed");
                        Err(QueryError::Internal(format!("fetch task failed: {join_err}")))
                    })
                }
                .boxed()
                .shared();

                registry.pending.insert(
                    key.to_string(),
                    Pending {
                        generation,
                        fetch: fetch.clone(),
                    },
                );
                fetch
            }
        };

        fetch.await
    }

    // == Introspection ==
    pub async fn pending_count(&self) -> usize {
        self.registry.lock().await.pending.len()
    }

    pub async fn is_pending(&self, key: &str) -> bool {
        self.registry.lock().await.pending.contains_key(key)
    }

    // == Clear ==
    /// Forgets every registration. Running fetches finish in the background
    /// but new callers start fresh ones.
    pub async fn clear(&self) -> usize {
        let mut registry = self.registry.lock().await;
        let dropped = registry.pending.len();
        registry.pending.clear();
        dropped
    }

    /// Forgets registrations whose key contains `pattern`.
    pub async fn forget_matching(&self, pattern: &str) -> usize {
        let mut registry = self.registry.lock().await;
        let before = registry.pending.len();
        registry.pending.retain(|key, _| !key.contains(pattern));
        before - registry.pending.len()
    }
}
