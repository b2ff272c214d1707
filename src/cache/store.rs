//! Cache Store Module
//!
//! Fixed-TTL result cache whose entries are tagged with the scope (project)
//! they were fetched for. Lookups only succeed for the matching scope.

use std::collections::HashMap;

use tracing::debug;

use crate::cache::{CacheEntry, CacheStats};
use crate::clock::SharedClock;

// == Scoped Cache ==
/// In-memory result cache with a single TTL and scope tagging.
#[derive(Debug)]
pub struct ScopedCache<V> {
    /// Key-value storage
    entries: HashMap<String, CacheEntry<V>>,
    /// Globally tracked current scope
    current_scope: Option<String>,
    /// Time-to-live for every entry, in milliseconds
    ttl_ms: u64,
    /// Time source
    clock: SharedClock,
    /// Performance statistics
    stats: CacheStats,
}

impl<V: Clone> ScopedCache<V> {
    // == Constructor ==
    /// Creates an empty cache with the given TTL and no current scope.
    pub fn new(ttl_ms: u64, clock: SharedClock) -> Self {
        Self {
            entries: HashMap::new(),
            current_scope: None,
            ttl_ms,
            clock,
            stats: CacheStats::new(),
        }
    }

    // == Get ==
    /// Returns the cached value for `key` if it is fresh and in scope.
    ///
    /// With `required_scope` the entry must be tagged with exactly that scope.
    /// Without it, the entry must be tagged with the current scope, so
    /// nominally global queries still go stale on a project switch.
    /// Expired entries are removed on the spot.
    pub fn get(&mut self, key: &str, required_scope: Option<&str>) -> Option<V> {
        let now = self.clock.now_ms();
        let wanted = required_scope.or(self.current_scope.as_deref());

        let Some(entry) = self.entries.get(key) else {
            self.stats.record_miss();
            return None;
        };

        if entry.is_expired(now, self.ttl_ms) {
            self.entries.remove(key);
            self.stats.record_expirations(1);
            self.stats.record_miss();
            self.stats.set_total_entries(self.entries.len());
            debug!(key, "cache entry expired");
            return None;
        }

        if !entry.belongs_to(wanted) {
            self.stats.record_miss();
            debug!(key, entry_scope = ?entry.scope_id, wanted_scope = ?wanted, "cache entry out of scope");
            return None;
        }

        self.stats.record_hit();
        Some(entry.value.clone())
    }

    // == Set ==
    /// Stores `value` under `key`, replacing any previous entry.
    ///
    /// `scope_id` defaults to the current scope.
    pub fn set(&mut self, key: impl Into<String>, value: V, scope_id: Option<String>) {
        let key = key.into();
        let scope_id = scope_id.or_else(|| self.current_scope.clone());
        let entry = CacheEntry::new(key.clone(), value, self.clock.now_ms(), scope_id);

        self.entries.insert(key, entry);
        self.stats.set_total_entries(self.entries.len());
    }

    // == Invalidation ==
    /// Removes every entry for which `predicate` returns true.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate_where<F>(&mut self, mut predicate: F) -> usize
    where
        F: FnMut(&str, &CacheEntry<V>) -> bool,
    {
        let before = self.entries.len();
        self.entries.retain(|key, entry| !predicate(key, entry));
        let removed = before - self.entries.len();

        self.stats.record_invalidations(removed);
        self.stats.set_total_entries(self.entries.len());
        removed
    }

    /// Removes every entry whose key contains `pattern`.
    pub fn invalidate_matching(&mut self, pattern: &str) -> usize {
        self.invalidate_where(|key, _| key.contains(pattern))
    }

    /// Removes every entry tagged with `scope_id`.
    pub fn invalidate_scope(&mut self, scope_id: Option<&str>) -> usize {
        self.invalidate_where(|_, entry| entry.belongs_to(scope_id))
    }

    /// Keeps only entries tagged with `scope_id`, dropping everything else
    /// including unscoped entries.
    pub fn retain_scope(&mut self, scope_id: Option<&str>) -> usize {
        self.invalidate_where(|_, entry| !entry.belongs_to(scope_id))
    }

    // == Clear ==
    /// Drops every entry.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        self.stats.record_invalidations(removed);
        self.stats.set_total_entries(0);
        removed
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&mut self) -> usize {
        let now = self.clock.now_ms();
        let ttl = self.ttl_ms;
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(now, ttl));
        let removed = before - self.entries.len();

        self.stats.record_expirations(removed);
        self.stats.set_total_entries(self.entries.len());
        removed
    }

    // == Scope ==
    /// Returns the scope lookups without an explicit scope are checked against.
    pub fn current_scope(&self) -> Option<&str> {
        self.current_scope.as_deref()
    }

    /// Replaces the current scope, returning the previous one.
    pub fn set_current_scope(&mut self, scope_id: Option<String>) -> Option<String> {
        std::mem::replace(&mut self.current_scope, scope_id)
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Arc;

    const TTL: u64 = 600_000;

    fn cache_with_clock() -> (ScopedCache<String>, ManualClock) {
        let clock = ManualClock::new(0);
        (ScopedCache::new(TTL, Arc::new(clock.clone())), clock)
    }

    #[test]
    fn test_store_new() {
        let (cache, _) = cache_with_clock();
        assert!(cache.is_empty());
        assert_eq!(cache.current_scope(), None);
        assert_eq!(cache.ttl_ms(), TTL);
    }

    #[test]
    fn test_set_and_get() {
        let (mut cache, _) = cache_with_clock();

        cache.set("leads", "data".to_string(), None);
        assert_eq!(cache.get("leads", None), Some("data".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_nonexistent() {
        let (mut cache, _) = cache_with_clock();
        assert_eq!(cache.get("nonexistent", None), None);
        assert_eq!(cache.stats().misses, 1);
    }

    #[test]
    fn test_ttl_boundary() {
        let (mut cache, clock) = cache_with_clock();
        cache.set("leads", "data".to_string(), None);

        clock.set(599_999);
        assert!(cache.get("leads", None).is_some());

        clock.set(600_000);
        assert!(cache.get("leads", None).is_none(), "boundary is exclusive");
        assert!(!cache.contains_key("leads"), "expired entry removed on read");
    }

    #[test]
    fn test_ttl_past_boundary() {
        let (mut cache, clock) = cache_with_clock();
        cache.set("leads", "data".to_string(), None);

        clock.set(600_001);
        assert!(cache.get("leads", None).is_none());
        assert_eq!(cache.stats().expirations, 1);
    }

    #[test]
    fn test_overwrite_restamps() {
        let (mut cache, clock) = cache_with_clock();
        cache.set("leads", "v1".to_string(), None);

        clock.set(500_000);
        cache.set("leads", "v2".to_string(), None);

        clock.set(700_000);
        assert_eq!(cache.get("leads", None), Some("v2".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_required_scope_must_match_exactly() {
        let (mut cache, _) = cache_with_clock();
        cache.set("leads@P1", "p1".to_string(), Some("P1".to_string()));

        assert_eq!(cache.get("leads@P1", Some("P1")), Some("p1".to_string()));
        assert_eq!(cache.get("leads@P1", Some("P2")), None);
    }

    #[test]
    fn test_unscoped_lookup_uses_current_scope() {
        let (mut cache, _) = cache_with_clock();
        cache.set_current_scope(Some("P1".to_string()));
        cache.set("projects", "list".to_string(), None);

        assert_eq!(cache.get("projects", None), Some("list".to_string()));

        cache.set_current_scope(Some("P2".to_string()));
        assert_eq!(cache.get("projects", None), None);
        assert!(cache.contains_key("projects"), "out-of-scope entry is kept");
    }

    #[test]
    fn test_set_defaults_to_current_scope() {
        let (mut cache, _) = cache_with_clock();
        cache.set_current_scope(Some("P1".to_string()));
        cache.set("projects", "list".to_string(), None);

        assert_eq!(cache.get("projects", Some("P1")), Some("list".to_string()));
    }

    #[test]
    fn test_invalidate_scope() {
        let (mut cache, _) = cache_with_clock();
        cache.set("leads@P1", "a".to_string(), Some("P1".to_string()));
        cache.set("clients@P1", "b".to_string(), Some("P1".to_string()));
        cache.set("leads@P2", "c".to_string(), Some("P2".to_string()));

        assert_eq!(cache.invalidate_scope(Some("P1")), 2);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("leads@P2", Some("P2")), Some("c".to_string()));
        assert_eq!(cache.stats().invalidations, 2);
    }

    #[test]
    fn test_retain_scope() {
        let (mut cache, _) = cache_with_clock();
        cache.set("leads@P1", "a".to_string(), Some("P1".to_string()));
        cache.set("leads@P2", "b".to_string(), Some("P2".to_string()));
        cache.set("projects", "c".to_string(), None);

        assert_eq!(cache.retain_scope(Some("P2")), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains_key("leads@P2"));
        assert_eq!(cache.get("leads@P1", Some("P1")), None);
    }

    #[test]
    fn test_invalidate_matching() {
        let (mut cache, _) = cache_with_clock();
        cache.set("leads@P1", "a".to_string(), None);
        cache.set("leads@P2", "b".to_string(), None);
        cache.set("clients@P1", "c".to_string(), None);

        assert_eq!(cache.invalidate_matching("leads"), 2);
        assert!(cache.contains_key("clients@P1"));
    }

    #[test]
    fn test_clear() {
        let (mut cache, _) = cache_with_clock();
        cache.set("a", "1".to_string(), Some("P1".to_string()));
        cache.set("b", "2".to_string(), Some("P2".to_string()));

        assert_eq!(cache.clear(), 2);
        assert!(cache.is_empty());
        assert_eq!(cache.stats().total_entries, 0);
    }

    #[test]
    fn test_purge_expired() {
        let (mut cache, clock) = cache_with_clock();
        cache.set("old", "1".to_string(), None);

        clock.set(300_000);
        cache.set("new", "2".to_string(), None);

        clock.set(650_000);
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("new", None).is_some());
    }

    #[test]
    fn test_stats() {
        let (mut cache, _) = cache_with_clock();
        cache.set("key1", "value1".to_string(), None);
        cache.get("key1", None);
        cache.get("missing", None);

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
    }
}
