// src/ingest/fingerprint.rs
//! Content fingerprint used as the per-source dedup key.

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use std::fmt::Write as _;

use crate::ingest::types::CandidateItem;

const SEPARATOR: &str = "\n";

/// Canonical text form of a published timestamp (RFC 3339, UTC, whole seconds).
pub fn canonical_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// SHA-256 over `title \n link \n published`, as 64 lowercase hex chars.
pub fn fingerprint(title: &str, link: &str, published: Option<&DateTime<Utc>>) -> String {
    let published = published.map(canonical_timestamp).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(SEPARATOR.as_bytes());
    hasher.update(link.as_bytes());
    hasher.update(SEPARATOR.as_bytes());
    hasher.update(published.as_bytes());
    let digest = hasher.finalize();

    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

pub fn fingerprint_item(item: &CandidateItem) -> String {
    fingerprint(&item.title, &item.link, item.published_at.as_ref())
}
