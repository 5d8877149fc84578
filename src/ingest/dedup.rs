// src/ingest/dedup.rs
//! Per-source "seen" sets with bounded recall.
//!
//! Each source's set is loaded once per run from its most recent `lookback`
//! records. A fingerprint that fell out of that window and shows up again is
//! treated as new; the window should therefore comfortably exceed what a
//! source publishes between two polls.

use std::collections::{HashMap, HashSet};

use crate::store::{self, Store, StoreError};

pub struct Deduplicator {
    lookback: usize,
    seen: HashMap<i64, HashSet<String>>,
}

impl Deduplicator {
    pub fn new(lookback: usize) -> Self {
        Self {
            lookback,
            seen: HashMap::new(),
        }
    }

    /// Load the recent fingerprints of `source_id`; later calls for the same
    /// source are no-ops within a run.
    pub async fn load(&mut self, store: &dyn Store, source_id: i64) -> Result<usize, StoreError> {
        if let Some(set) = self.seen.get(&source_id) {
            return Ok(set.len());
        }
        let fps = store::recent_fingerprints(store, source_id, self.lookback).await?;
        let set: HashSet<String> = fps.into_iter().collect();
        let n = set.len();
        self.seen.insert(source_id, set);
        Ok(n)
    }

    pub fn is_new(&self, source_id: i64, fingerprint: &str) -> bool {
        self.seen
            .get(&source_id)
            .map_or(true, |set| !set.contains(fingerprint))
    }

    /// Mark as seen for the rest of the run. Returns false if it already was.
    pub fn record(&mut self, source_id: i64, fingerprint: &str) -> bool {
        self.seen
            .entry(source_id)
            .or_default()
            .insert(fingerprint.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::ITEMS;
    use serde_json::json;

    fn seeded(n: usize) -> MemoryStore {
        let store = MemoryStore::new();
        for i in 0..n {
            store.seed(
                ITEMS,
                json!({
                    "source_id": 1,
                    "fingerprint": format!("fp{i}"),
                    "created_at": format!("2025-01-01T00:{:02}:00Z", i),
                }),
            );
        }
        store.seed(ITEMS, json!({"source_id": 2, "fingerprint": "other"}));
        store
    }

    #[tokio::test]
    async fn known_fingerprints_are_not_new() {
        let store = seeded(3);
        let mut d = Deduplicator::new(250);
        assert_eq!(d.load(&store, 1).await.unwrap(), 3);
        assert!(!d.is_new(1, "fp0"));
        assert!(d.is_new(1, "fp9"));
        // Scoped per source.
        assert!(d.is_new(1, "other"));
    }

    #[tokio::test]
    async fn lookback_bounds_recall_to_most_recent() {
        let store = seeded(10);
        let mut d = Deduplicator::new(4);
        assert_eq!(d.load(&store, 1).await.unwrap(), 4);
        assert!(!d.is_new(1, "fp9"));
        assert!(!d.is_new(1, "fp6"));
        // Older than the window: treated as new.
        assert!(d.is_new(1, "fp5"));
    }

    #[tokio::test]
    async fn record_prevents_second_acceptance_in_same_run() {
        let store = MemoryStore::new();
        let mut d = Deduplicator::new(10);
        d.load(&store, 5).await.unwrap();
        assert!(d.is_new(5, "x"));
        assert!(d.record(5, "x"));
        assert!(!d.is_new(5, "x"));
        assert!(!d.record(5, "x"));
    }
}
