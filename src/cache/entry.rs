//! Cache Entry Module
//!
//! Defines a single cached query result, tagged with the scope it was fetched for.

// == Cache Entry ==
/// Represents a single cached result with its fetch time and scope tag.
///
/// Entries are never updated in place; a refetch replaces the whole entry.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<V> {
    /// Logical key the value was stored under
    pub key: String,
    /// The cached value
    pub value: V,
    /// Store timestamp (Unix milliseconds)
    pub stored_at: u64,
    /// Scope (project) the value belongs to, None = unscoped
    pub scope_id: Option<String>,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new entry stamped at `now_ms`.
    pub fn new(key: impl Into<String>, value: V, now_ms: u64, scope_id: Option<String>) -> Self {
        Self {
            key: key.into(),
            value,
            stored_at: now_ms,
            scope_id,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has outlived `ttl_ms`.
    ///
    /// Boundary condition: an entry whose age equals the TTL is expired, so
    /// validity is `age < ttl`.
    pub fn is_expired(&self, now_ms: u64, ttl_ms: u64) -> bool {
        self.age_ms(now_ms) >= ttl_ms
    }

    /// Milliseconds since the entry was stored. A clock that moved backwards
    /// reads as age 0.
    pub fn age_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.stored_at)
    }

    /// Remaining lifetime in milliseconds, 0 once expired.
    pub fn ttl_remaining_ms(&self, now_ms: u64, ttl_ms: u64) -> u64 {
        ttl_ms.saturating_sub(self.age_ms(now_ms))
    }

    // == Scope Match ==
    /// Returns true if the entry is tagged with exactly `scope_id`.
    pub fn belongs_to(&self, scope_id: Option<&str>) -> bool {
        self.scope_id.as_deref() == scope_id
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    const TTL: u64 = 600_000;

    #[test]
    fn test_entry_creation() {
        let entry = CacheEntry::new("leads", "value", 1_000, Some("P1".to_string()));

        assert_eq!(entry.key, "leads");
        assert_eq!(entry.value, "value");
        assert_eq!(entry.stored_at, 1_000);
        assert!(entry.belongs_to(Some("P1")));
    }

    #[test]
    fn test_expiration_boundary_condition() {
        let entry = CacheEntry::new("k", 1, 0, None);

        assert!(!entry.is_expired(TTL - 1, TTL));
        assert!(entry.is_expired(TTL, TTL), "Entry should be expired at boundary");
        assert!(entry.is_expired(TTL + 1, TTL));
    }

    #[test]
    fn test_clock_skew_is_not_expired() {
        let entry = CacheEntry::new("k", 1, 5_000, None);

        assert_eq!(entry.age_ms(1_000), 0);
        assert!(!entry.is_expired(1_000, TTL));
    }

    #[test]
    fn test_ttl_remaining() {
        let entry = CacheEntry::new("k", 1, 0, None);

        assert_eq!(entry.ttl_remaining_ms(0, TTL), TTL);
        assert_eq!(entry.ttl_remaining_ms(100_000, TTL), 500_000);
        assert_eq!(entry.ttl_remaining_ms(TTL + 5, TTL), 0);
    }

    #[test]
    fn test_unscoped_entry() {
        let entry = CacheEntry::new("k", 1, 0, None);

        assert!(entry.belongs_to(None));
        assert!(!entry.belongs_to(Some("P1")));
    }
}
