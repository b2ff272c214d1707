//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check TTL, scope and statistics behaviour of `ScopedCache`.

use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::ScopedCache;
use crate::clock::ManualClock;

// == Test Configuration ==
const TEST_TTL: u64 = 600_000;

// == Strategies ==
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z_]{1,16}".prop_map(|s| s)
}

fn scope_strategy() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some("P1".to_string())),
        Just(Some("P2".to_string())),
        Just(Some("P3".to_string())),
    ]
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, scope: Option<String> },
    Get { key: String, scope: Option<String> },
    InvalidateScope { scope: Option<String> },
    Advance { ms: u64 },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), scope_strategy()).prop_map(|(key, scope)| CacheOp::Set { key, scope }),
        (key_strategy(), scope_strategy()).prop_map(|(key, scope)| CacheOp::Get { key, scope }),
        scope_strategy().prop_map(|scope| CacheOp::InvalidateScope { scope }),
        (0u64..200_000).prop_map(|ms| CacheOp::Advance { ms }),
    ]
}

fn new_cache() -> (ScopedCache<u32>, ManualClock) {
    let clock = ManualClock::new(1_000_000);
    (ScopedCache::new(TEST_TTL, Arc::new(clock.clone())), clock)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // An entry is served strictly before its TTL elapses and never after.
    #[test]
    fn prop_ttl_validity(key in key_strategy(), elapsed in 0u64..(TEST_TTL * 2)) {
        let (mut cache, clock) = new_cache();
        cache.set(key.clone(), 7, None);

        clock.advance(elapsed);
        let hit = cache.get(&key, None).is_some();
        prop_assert_eq!(hit, elapsed < TEST_TTL);
    }

    // Scope invalidation removes exactly the entries tagged with that scope.
    #[test]
    fn prop_invalidate_scope_is_exact(
        entries in prop::collection::vec((key_strategy(), scope_strategy()), 1..40),
        target in scope_strategy()
    ) {
        let (mut cache, _) = new_cache();
        let mut model: HashMap<String, Option<String>> = HashMap::new();
        for (key, scope) in entries {
            cache.set(key.clone(), 1, scope.clone());
            model.insert(key, scope);
        }

        let expected = model.values().filter(|s| **s == target).count();
        let removed = cache.invalidate_scope(target.as_deref());
        prop_assert_eq!(removed, expected);

        for (key, scope) in &model {
            let present = cache.get(key, scope.as_deref()).is_some();
            prop_assert_eq!(present, *scope != target, "key {} scope {:?}", key, scope);
        }
    }

    // Overwriting a key keeps one entry holding the latest value.
    #[test]
    fn prop_overwrite_semantics(key in key_strategy(), first in any::<u32>(), second in any::<u32>()) {
        let (mut cache, _) = new_cache();
        cache.set(key.clone(), first, None);
        cache.set(key.clone(), second, None);

        prop_assert_eq!(cache.get(&key, None), Some(second));
        prop_assert_eq!(cache.len(), 1);
    }

    // Hit and miss counters agree with observed lookups for any sequence.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let (mut cache, clock) = new_cache();
        let mut expected_hits = 0u64;
        let mut expected_misses = 0u64;

        for op in ops {
            match op {
                CacheOp::Set { key, scope } => cache.set(key, 1, scope),
                CacheOp::Get { key, scope } => match cache.get(&key, scope.as_deref()) {
                    Some(_) => expected_hits += 1,
                    None => expected_misses += 1,
                },
                CacheOp::InvalidateScope { scope } => {
                    cache.invalidate_scope(scope.as_deref());
                }
                CacheOp::Advance { ms } => clock.advance(ms),
            }
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.hits, expected_hits);
        prop_assert_eq!(stats.misses, expected_misses);
        prop_assert_eq!(stats.total_entries, cache.len());
    }

    // Clearing leaves nothing retrievable under any scope.
    #[test]
    fn prop_clear_empties_everything(
        entries in prop::collection::vec((key_strategy(), scope_strategy()), 1..40)
    ) {
        let (mut cache, _) = new_cache();
        for (key, scope) in &entries {
            cache.set(key.clone(), 1, scope.clone());
        }

        cache.clear();

        prop_assert!(cache.is_empty());
        for (key, scope) in &entries {
            prop_assert!(cache.get(key, scope.as_deref()).is_none());
        }
    }
}
