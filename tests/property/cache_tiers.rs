//! Property-based tests for the tiered cache

use folio::cache::CacheHierarchy;
use folio::store::MemoryStore;
use folio::types::Fingerprint;
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Op {
    Insert(u8, u16),
    Lookup(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..16, any::<u16>()).prop_map(|(k, v)| Op::Insert(k, v)),
        (0u8..16).prop_map(Op::Lookup),
    ]
}

fn key(k: u8) -> Fingerprint {
    [k; 32]
}

#[test]
fn test_every_key_lives_in_exactly_one_tier() {
    let mut runner = proptest::test_runner::TestRunner::default();

    runner
        .run(
            &(1usize..4, 1usize..5, prop::collection::vec(op(), 1..80)),
            |(l1, l2, ops)| {
                let cache =
                    CacheHierarchy::with_capacities(l1, l2, Arc::new(MemoryStore::new())).unwrap();
                // First insert wins; later inserts of the same key keep the stored value.
                let mut model: HashMap<u8, String> = HashMap::new();

                for op in ops {
                    match op {
                        Op::Insert(k, v) => {
                            cache.insert(key(k), v.to_string()).unwrap();
                            model.entry(k).or_insert_with(|| v.to_string());
                        }
                        Op::Lookup(k) => {
                            let found = cache.lookup(&key(k)).unwrap();
                            prop_assert_eq!(found.as_ref(), model.get(&k));
                        }
                    }

                    let sizes = cache.sizes().unwrap();
                    prop_assert!(sizes.l1 <= l1);
                    prop_assert!(sizes.l2 <= l2);
                    prop_assert_eq!(sizes.l1 + sizes.l2 + sizes.l3, model.len());
                    for k in model.keys() {
                        prop_assert!(cache.tier_of(&key(*k)).unwrap().is_some());
                    }
                }
                Ok(())
            },
        )
        .unwrap();
}
