#![allow(unused)]
//! Message store integration harness.
//!
//! # What this covers
//!
//! - **Capacity**: after any append the store holds at most `high_water`
//!   events; crossing it drops the oldest `evict_batch` at once.
//! - **Order**: snapshots are oldest first and survive eviction in order.
//! - **Search and clear**.
//!
//! # Running
//!
//! ```sh
//! cargo test --test store_harness
//! ```

mod common;
use common::*;

use chatwatch_core::store::{DEFAULT_EVICT_BATCH, DEFAULT_HIGH_WATER};
use chatwatch_core::{ChannelKind, MessageStore};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn fill(store: &mut MessageStore, n: usize) {
    for i in 0..n {
        store.append(general(&format!("t{i}"), &format!("line {i}")));
    }
}

#[test]
fn default_store_evicts_in_batches() {
    let mut store = MessageStore::new(DEFAULT_HIGH_WATER, DEFAULT_EVICT_BATCH);
    fill(&mut store, 5000);
    assert_eq!(store.len(), 5000);

    fill(&mut store, 1);
    assert_eq!(store.len(), 4901);

    let mut store = MessageStore::new(DEFAULT_HIGH_WATER, DEFAULT_EVICT_BATCH);
    fill(&mut store, 5050);
    assert_eq!(store.len(), 4950);
    assert_eq!(store.evicted_total(), 100);
    assert_eq!(store.snapshot()[0].text, "line 100");
    assert_eq!(store.snapshot().last().unwrap().text, "line 5049");
}

proptest! {
    #[test]
    fn never_exceeds_high_water(
        high_water in 1usize..60,
        batch in 1usize..20,
        appends in 0usize..200,
    ) {
        let mut store = MessageStore::new(high_water, batch);
        let mut next = 0usize;
        for _ in 0..appends {
            store.append(general("t", &next.to_string()));
            next += 1;
            prop_assert!(store.len() <= high_water);
        }
        // Survivors are the newest, contiguous and in order.
        let texts: Vec<usize> = store.iter().map(|e| e.text.parse().unwrap()).collect();
        for w in texts.windows(2) {
            prop_assert_eq!(w[0] + 1, w[1]);
        }
        if let Some(last) = texts.last() {
            prop_assert_eq!(*last, appends - 1);
        }
    }
}

#[test]
fn search_is_case_insensitive_and_ordered() {
    let mut store = MessageStore::new(10, 1);
    store.append(event(ChannelKind::Team, "Boss at gate"));
    store.append(event(ChannelKind::General, "hello"));
    store.append(event(ChannelKind::Shout, "BOSS down"));

    let hits: Vec<_> = store.search("boss").into_iter().map(|e| e.text.clone()).collect();
    assert_eq!(hits, vec!["Boss at gate".to_string(), "BOSS down".to_string()]);
}

#[test]
fn clear_empties_without_touching_capacity() {
    let mut store = MessageStore::new(3, 1);
    fill(&mut store, 3);
    store.clear();
    assert!(store.is_empty());
    assert_eq!(store.high_water(), 3);
    fill(&mut store, 4);
    assert_eq!(store.len(), 3);
}
