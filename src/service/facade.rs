//! Query Service
//!
//! The one entry point callers use. A query goes through the circuit breaker,
//! then the cache, then the request coordinator wrapping the retry wrapper.
//! The service also owns the current scope and session lifecycle.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::cache::{derive_key, CacheStats, ScopedCache};
use crate::clock::{SharedClock, SystemClock};
use crate::config::Config;
use crate::coordinator::RequestCoordinator;
use crate::error::Result;
use crate::resilience::{
    with_retry, BreakerConfig, BreakerSnapshot, CircuitBreaker, RetryOutcome, RetryPolicy,
};
use crate::service::events::{RefreshBroadcaster, RefreshEvent, SessionResetReason};
use crate::service::query::{FallbackReason, QueryOptions, QueryOutcome};

// == Settings ==
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceSettings {
    pub cache_ttl_ms: u64,
    pub breaker: BreakerConfig,
    pub retry: RetryPolicy,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ServiceSettings {
    fn from(config: &Config) -> Self {
        Self {
            cache_ttl_ms: config.cache_ttl_ms,
            breaker: config.breaker(),
            retry: config.retry_policy(),
        }
    }
}

/// Snapshot of the service for the stats endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ServiceStats {
    pub cache: CacheStats,
    pub breaker: BreakerSnapshot,
    pub pending_requests: usize,
    pub current_scope: Option<String>,
}

// == Query Service ==
/// Cache, breaker, coordinator and retry composed behind one API.
///
/// Cloning is cheap; clones share all state.
pub struct QueryService<V> {
    cache: Arc<RwLock<ScopedCache<V>>>,
    breaker: Arc<Mutex<CircuitBreaker>>,
    coordinator: RequestCoordinator<QueryOutcome<V>>,
    events: RefreshBroadcaster,
    retry: RetryPolicy,
    /// Bumped (under the cache write lock) whenever cached data must not be
    /// repopulated by fetches started earlier.
    epoch: Arc<AtomicU64>,
}

impl<V> Clone for QueryService<V> {
    fn clone(&self) -> Self {
        Self {
            cache: Arc::clone(&self.cache),
            breaker: Arc::clone(&self.breaker),
            coordinator: self.coordinator.clone(),
            events: self.events.clone(),
            retry: self.retry,
            epoch: Arc::clone(&self.epoch),
        }
    }
}

impl<V> QueryService<V>
where
    V: Clone + Send + Sync + 'static,
{
    // == Constructors ==
    pub fn new(settings: ServiceSettings, clock: SharedClock) -> Self {
        Self {
            cache: Arc::new(RwLock::new(ScopedCache::new(
                settings.cache_ttl_ms,
                Arc::clone(&clock),
            ))),
            breaker: Arc::new(Mutex::new(CircuitBreaker::new(settings.breaker, clock))),
            coordinator: RequestCoordinator::new(),
            events: RefreshBroadcaster::new(),
            retry: settings.retry,
            epoch: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Creates a service on the system clock from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(ServiceSettings::from(config), Arc::new(SystemClock))
    }

    // == Query ==
    /// Runs a logical query for `entity`, optionally scoped to a project.
    ///
    /// `producer` performs one backend call; it may be invoked several times
    /// by the retry wrapper, and not at all on a cache hit, an open circuit,
    /// or when joining a request already in flight.
    pub async fn query<F, Fut>(
        &self,
        entity: &str,
        scope_id: Option<&str>,
        producer: F,
        options: QueryOptions<V>,
    ) -> Result<QueryOutcome<V>>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        if let Err(err) = self.breaker.lock().await.check() {
            return match options.fallback {
                Some(value) => {
                    warn!(entity, error = %err, "circuit open, serving fallback data");
                    Ok(QueryOutcome::fallback(value, FallbackReason::CircuitOpen))
                }
                None => {
                    debug!(entity, error = %err, "circuit open, rejecting query");
                    Err(err)
                }
            };
        }

        let key = derive_key(entity, scope_id);
        let scope_tag = {
            let mut cache = self.cache.write().await;
            if !options.bypass_cache {
                if let Some(value) = cache.get(&key, scope_id) {
                    debug!(key = %key, "cache hit");
                    return Ok(QueryOutcome::cached(value));
                }
            }
            scope_id
                .map(str::to_string)
                .or_else(|| cache.current_scope().map(str::to_string))
        };

        let policy = options.retry.unwrap_or(self.retry);
        let fallback = options.fallback;
        let cache = Arc::clone(&self.cache);
        let breaker = Arc::clone(&self.breaker);
        let epoch = Arc::clone(&self.epoch);
        let started_epoch = epoch.load(Ordering::SeqCst);
        let cache_key = key.clone();

        self.coordinator
            .fetch_once_for(&key, move || async move {
                match with_retry(&policy, fallback, producer).await {
                    Ok(RetryOutcome::Succeeded { value, attempts }) => {
                        {
                            let mut cache = cache.write().await;
                            if epoch.load(Ordering::SeqCst) == started_epoch {
                                cache.set(cache_key, value.clone(), scope_tag);
                            } else {
                                debug!(key = %cache_key, "scope or session changed mid-flight, result not cached");
                            }
                        }
                        breaker.lock().await.record_success();
                        Ok(QueryOutcome::fetched(value, attempts))
                    }
                    Ok(RetryOutcome::FellBack {
                        value, last_error, ..
                    }) => {
                        breaker.lock().await.record_failure(&last_error);
                        Ok(QueryOutcome::fallback(value, FallbackReason::RetriesExhausted))
                    }
                    Err(err) => {
                        breaker.lock().await.record_failure(&err);
                        warn!(key = %cache_key, error = %err, "query failed");
                        Err(err)
                    }
                }
            })
            .await
    }

    // == Scope ==
    /// Switches the current scope.
    ///
    /// Returns false when `new_scope` is already current. Otherwise every
    /// entry not tagged with `new_scope` is dropped, unscoped entries and
    /// those of the old scope included, and a refresh event is sent.
    pub async fn on_scope_changed(&self, new_scope: Option<String>) -> bool {
        let (previous, invalidated) = {
            let mut cache = self.cache.write().await;
            if cache.current_scope() == new_scope.as_deref() {
                return false;
            }
            let previous = cache.set_current_scope(new_scope.clone());
            let invalidated = cache.retain_scope(new_scope.as_deref());
            self.epoch.fetch_add(1, Ordering::SeqCst);
            (previous, invalidated)
        };
        self.coordinator.clear().await;

        info!(?previous, current = ?new_scope, invalidated, "scope changed");
        self.events.send(RefreshEvent::ScopeChanged {
            previous,
            current: new_scope,
            invalidated,
        });
        true
    }

    pub async fn current_scope(&self) -> Option<String> {
        self.cache.read().await.current_scope().map(str::to_string)
    }

    // == Session ==
    /// Sign-out: drops every per-user cached result and the current scope.
    pub async fn on_session_ended(&self) -> usize {
        self.reset_session(SessionResetReason::SessionEnded).await
    }

    /// Sign-in: may be a different user, so nothing cached is trusted.
    pub async fn on_user_authenticated(&self) -> usize {
        self.reset_session(SessionResetReason::UserAuthenticated)
            .await
    }

    async fn reset_session(&self, reason: SessionResetReason) -> usize {
        let invalidated = {
            let mut cache = self.cache.write().await;
            cache.set_current_scope(None);
            self.epoch.fetch_add(1, Ordering::SeqCst);
            cache.clear()
        };
        let abandoned = self.coordinator.clear().await;

        info!(?reason, invalidated, abandoned, "session reset, cache cleared");
        self.events.send(RefreshEvent::SessionReset {
            reason,
            invalidated,
        });
        invalidated
    }

    // == Manual Controls ==
    /// Drops cached data for `scope_id`, or everything when None.
    pub async fn force_refresh(&self, scope_id: Option<&str>) -> usize {
        let invalidated = {
            let mut cache = self.cache.write().await;
            self.epoch.fetch_add(1, Ordering::SeqCst);
            match scope_id {
                Some(scope) => cache.invalidate_scope(Some(scope)),
                None => cache.clear(),
            }
        };
        self.coordinator.clear().await;

        info!(?scope_id, invalidated, "forced refresh");
        self.events.send(RefreshEvent::Forced {
            scope_id: scope_id.map(str::to_string),
            invalidated,
        });
        invalidated
    }

    /// Drops entries whose key contains `pattern`, e.g. after a mutation.
    ///
    /// Reads already in flight still answer their callers but do not
    /// repopulate the cache, and later callers start a fresh fetch.
    pub async fn invalidate_matching(&self, pattern: &str) -> usize {
        let invalidated = {
            let mut cache = self.cache.write().await;
            self.epoch.fetch_add(1, Ordering::SeqCst);
            cache.invalidate_matching(pattern)
        };
        let abandoned = self.coordinator.forget_matching(pattern).await;
        debug!(pattern, invalidated, abandoned, "invalidated by pattern");
        invalidated
    }

    pub async fn reset_circuit_breaker(&self) {
        self.breaker.lock().await.reset();
    }

    pub async fn purge_expired(&self) -> usize {
        self.cache.write().await.purge_expired()
    }

    // == Observation ==
    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.events.subscribe()
    }

    pub async fn stats(&self) -> ServiceStats {
        let (cache, current_scope) = {
            let cache = self.cache.read().await;
            (cache.stats(), cache.current_scope().map(str::to_string))
        };
        ServiceStats {
            cache,
            breaker: self.breaker.lock().await.snapshot(),
            pending_requests: self.coordinator.pending_count().await,
            current_scope,
        }
    }
}
