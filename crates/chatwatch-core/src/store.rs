//! Store: capacity-bounded, append-only history of accepted [`RawEvent`]s.
//!
//! Every extracted event is stored regardless of its current disposition, so a
//! later rule change can reveal history that was hidden when it arrived. The
//! store is the source for replays; sinks keep their own display history.
//!
//! # Eviction is lossy
//!
//! Once the length exceeds the high-water mark (5000 by default) the oldest
//! batch (100 by default) is dropped. Evicted events are gone for good; a
//! replay after eviction cannot show them. Eviction never touches what sinks
//! have already rendered.

use crate::types::RawEvent;
use std::collections::VecDeque;

pub const DEFAULT_HIGH_WATER: usize = 5000;
pub const DEFAULT_EVICT_BATCH: usize = 100;

/// Ordered event history; insertion order is arrival order.
#[derive(Debug, Clone)]
pub struct MessageStore {
    events: VecDeque<RawEvent>,
    high_water: usize,
    evict_batch: usize,
    evicted_total: u64,
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new(DEFAULT_HIGH_WATER, DEFAULT_EVICT_BATCH)
    }
}

impl MessageStore {
    /// Create a store with a custom high-water mark and eviction batch. A zero
    /// batch is treated as one so eviction always makes progress.
    pub fn new(high_water: usize, evict_batch: usize) -> Self {
        Self {
            events: VecDeque::with_capacity(high_water.saturating_add(1).min(DEFAULT_HIGH_WATER + 1)),
            high_water,
            evict_batch: evict_batch.max(1),
            evicted_total: 0,
        }
    }

    /// Store an event and apply the capacity policy. Returns the number of
    /// events evicted as a result (0 or one batch).
    pub fn append(&mut self, event: RawEvent) -> usize {
        self.events.push_back(event);
        self.evict_if_over_capacity()
    }

    /// Drop the oldest batch if the length exceeds the high-water mark.
    /// Returns how many events were removed.
    pub fn evict_if_over_capacity(&mut self) -> usize {
        if self.events.len() <= self.high_water {
            return 0;
        }
        let n = self.evict_batch.min(self.events.len());
        self.events.drain(..n);
        self.evicted_total += n as u64;
        tracing::debug!(evicted = n, remaining = self.events.len(), "store over capacity");
        n
    }

    /// Owned copy of the history, oldest first.
    pub fn snapshot(&self) -> Vec<RawEvent> {
        self.events.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &RawEvent> + ExactSizeIterator {
        self.events.iter()
    }

    /// Events whose text contains `needle`, ignoring case, oldest first. An
    /// empty needle matches nothing.
    pub fn search(&self, needle: &str) -> Vec<&RawEvent> {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        self.events
            .iter()
            .filter(|event| event.text.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn high_water(&self) -> usize {
        self.high_water
    }

    pub fn evict_batch(&self) -> usize {
        self.evict_batch
    }

    /// Total events evicted since creation.
    pub fn evicted_total(&self) -> u64 {
        self.evicted_total
    }
}
