//! Cache Module
//!
//! Provides the scope-tagged, fixed-TTL result cache.

mod entry;
mod stats;
mod store;

#[cfg(test)]
mod property_tests;

// Re-export public types
pub use entry::CacheEntry;
pub use stats::CacheStats;
pub use store::ScopedCache;

// == Public Constants ==
/// Maximum allowed entity name length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Separator between entity and scope in a derived key
pub const SCOPE_SEPARATOR: char = '@';

// == Key Derivation ==
/// Builds the cache key for a logical query: `entity` or `entity@scope`.
pub fn derive_key(entity: &str, scope_id: Option<&str>) -> String {
    match scope_id {
        Some(scope) => format!("{entity}{SCOPE_SEPARATOR}{scope}"),
        None => entity.to_string(),
    }
}
