// src/ingest/scheduler.rs
//! Round-robin source selection without a stored cursor.
//!
//! Each invocation polls a contiguous window of at most `n` sources starting
//! at `epoch mod len`. With a coarse epoch (whole minutes) repeated short runs
//! walk the whole list. Adding or removing sources between runs shifts the
//! offsets, so a source can be skipped or repeated for a short while; it is
//! picked up again once the epoch wraps.

use chrono::{DateTime, Utc};

use crate::ingest::types::Source;

/// Sources a run may poll: enabled and not still pointing at a placeholder URL.
pub fn eligible_sources(all: &[Source], placeholder_marker: &str) -> Vec<Source> {
    all.iter()
        .filter(|s| s.enabled)
        .filter(|s| placeholder_marker.is_empty() || !s.url.contains(placeholder_marker))
        .cloned()
        .collect()
}

/// Indices of the window `[epoch mod len, +n)`, wrapping, each index at most once.
pub fn window_indices(len: usize, epoch: u64, n: usize) -> Vec<usize> {
    if len == 0 || n == 0 {
        return Vec::new();
    }
    let start = (epoch % len as u64) as usize;
    (0..n.min(len)).map(|i| (start + i) % len).collect()
}

pub fn select_window(sources: &[Source], epoch: u64, n: usize) -> Vec<Source> {
    window_indices(sources.len(), epoch, n)
        .into_iter()
        .map(|i| sources[i].clone())
        .collect()
}

/// Whole minutes since the Unix epoch.
pub fn minute_epoch(now: DateTime<Utc>) -> u64 {
    u64::try_from(now.timestamp().max(0) / 60).unwrap_or(0)
}
