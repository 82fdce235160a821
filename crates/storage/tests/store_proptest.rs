//! Property-based tests for tidal-storage using proptest.

use futures::{FutureExt, StreamExt};
use proptest::prelude::*;
use std::collections::HashSet;
use tidal_core::{Delta, Quad, QuadPattern, Term};
use tidal_storage::{QuadStream, StreamingStore};

fn quad(i: u8) -> Quad {
    Quad::triple(
        Term::iri(format!("s{}", i % 4)),
        Term::iri(format!("p{}", i % 2)),
        Term::iri(format!("o{}", i)),
    )
}

fn ready_items(stream: &mut QuadStream) -> Vec<Delta<Quad>> {
    let mut items = Vec::new();
    while let Some(Some(item)) = stream.next().now_or_never() {
        items.push(item.unwrap());
    }
    items
}

proptest! {
    /// Replaying a channel's deltas over an empty set reproduces the store.
    #[test]
    fn channel_deltas_reconstruct_store(ops in prop::collection::vec((any::<bool>(), 0u8..12), 1..200)) {
        let store = StreamingStore::new();
        let mut stream = store.match_quads(QuadPattern::any());
        let mut effective_adds = 0usize;
        let mut effective_removes = 0usize;
        let mut model = HashSet::new();

        for (is_add, i) in &ops {
            if *is_add {
                if model.insert(quad(*i)) {
                    effective_adds += 1;
                }
                store.add(quad(*i)).unwrap();
            } else {
                if model.remove(&quad(*i)) {
                    effective_removes += 1;
                }
                store.remove(quad(*i)).unwrap();
            }
        }

        let items = ready_items(&mut stream);
        prop_assert_eq!(items.iter().filter(|d| d.is_addition()).count(), effective_adds);
        prop_assert_eq!(items.iter().filter(|d| d.is_retraction()).count(), effective_removes);

        let mut rebuilt = HashSet::new();
        for delta in items {
            if delta.is_addition() {
                prop_assert!(rebuilt.insert(delta.data), "addition of a present quad");
            } else {
                prop_assert!(rebuilt.remove(&delta.data), "retraction of an absent quad");
            }
        }
        prop_assert_eq!(rebuilt, model);
    }

    /// Filtered channels see exactly the matching subset of mutations.
    #[test]
    fn pattern_channels_see_matching_subset(ops in prop::collection::vec((any::<bool>(), 0u8..12), 1..100)) {
        let store = StreamingStore::new();
        let pattern = QuadPattern::new(Some(Term::iri("s1")), None, None, None);
        let mut all = store.match_quads(QuadPattern::any());
        let mut filtered = store.match_quads(pattern.clone());

        for (is_add, i) in &ops {
            if *is_add {
                store.add(quad(*i)).unwrap();
            } else {
                store.remove(quad(*i)).unwrap();
            }
        }

        let expected: Vec<_> = ready_items(&mut all)
            .into_iter()
            .filter(|d| pattern.matches(&d.data))
            .collect();
        prop_assert_eq!(ready_items(&mut filtered), expected);
        prop_assert_eq!(store.count(&pattern), store.snapshot(&pattern).len());
    }
}
