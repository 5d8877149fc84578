// src/ingest/parse/mod.rs
pub mod feed;
pub mod scrape;

use metrics::counter;

use crate::config::scrape_rules::ScrapeRules;
use crate::ingest::types::{CandidateItem, Source, SourceKind};

/// Upper bound on candidates taken from one source per run.
pub const MAX_CANDIDATES_PER_SOURCE: usize = 10;

/// Turns raw fetched content into candidates. Implementations never fail;
/// anything they cannot make sense of is left out.
pub trait ExtractItems {
    fn extract(&self, raw: &str, source: &Source) -> Vec<CandidateItem>;
}

/// Pick the parser for the source's kind, extract, and cap the result.
pub fn extract_candidates(raw: &str, source: &Source, rules: &ScrapeRules) -> Vec<CandidateItem> {
    let mut items = match source.kind {
        SourceKind::Feed => feed::FeedParser.extract(raw, source),
        SourceKind::PageScrape => scrape::PageScraper { rules }.extract(raw, source),
    };
    items.truncate(MAX_CANDIDATES_PER_SOURCE);
    counter!("sentinel_candidates_total").increment(items.len() as u64);
    items
}
