// src/ingest/parse/feed.rs
//! Tolerant RSS/Atom item extraction.
//!
//! Items are found by pattern matching rather than a full XML parse, so
//! malformed or mixed-dialect feeds still yield whatever well-formed items
//! they contain. Items without a title or link are dropped silently.

use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;

use super::ExtractItems;
use crate::ingest::types::{CandidateItem, Source};
use crate::ingest::{normalize_text, strip_cdata};

static RE_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<(?:item|entry)\b[^>]*>(.*?)</(?:item|entry)\s*>").expect("item regex")
});
static RE_LINK_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<link\b([^>]*?)/?>").expect("link tag regex"));
static RE_HREF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)\bhref\s*=\s*["']([^"']+)["']"#).expect("href regex"));
static RE_REL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)\brel\s*=\s*["']([^"']+)["']"#).expect("rel regex"));

static RE_TITLE: Lazy<Regex> = Lazy::new(|| paired_tag("title"));
static RE_LINK: Lazy<Regex> = Lazy::new(|| paired_tag("link"));
static RE_GUID: Lazy<Regex> = Lazy::new(|| paired_tag("guid"));
static RE_ID: Lazy<Regex> = Lazy::new(|| paired_tag("id"));
static RE_DATES: Lazy<Vec<Regex>> = Lazy::new(|| {
    ["pubDate", "published", "updated", "dc:date"]
        .iter()
        .map(|t| paired_tag(t))
        .collect()
});

/// `<name attr...>inner</name>`, case-insensitive, attributes ignored.
fn paired_tag(name: &str) -> Regex {
    let n = regex::escape(name);
    Regex::new(&format!(r"(?is)<{n}\b[^>]*>(.*?)</{n}\s*>")).expect("tag regex")
}

fn capture(re: &Regex, block: &str) -> Option<String> {
    re.captures(block)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn clean_url(raw: &str) -> Option<String> {
    let s = html_escape::decode_html_entities(strip_cdata(raw).trim()).trim().to_string();
    (!s.is_empty()).then_some(s)
}

/// RSS `<link>url</link>`, falling back to Atom `<link href="..."/>`
/// (preferring `rel="alternate"` or no rel).
fn extract_link(block: &str) -> Option<String> {
    if let Some(link) = capture(&RE_LINK, block).and_then(|s| clean_url(&s)) {
        return Some(link);
    }
    let mut fallback = None;
    for tag in RE_LINK_TAG.captures_iter(block) {
        let attrs = tag.get(1).map(|m| m.as_str()).unwrap_or_default();
        let Some(href) = capture(&RE_HREF, attrs).and_then(|s| clean_url(&s)) else {
            continue;
        };
        match capture(&RE_REL, attrs) {
            None => return Some(href),
            Some(rel) if rel.eq_ignore_ascii_case("alternate") => return Some(href),
            Some(_) => {
                fallback.get_or_insert(href);
            }
        }
    }
    fallback
}

/// Parse RFC 2822, RFC 3339 and a couple of common naive forms (taken as UTC).
/// Anything else is treated as absent.
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let s = strip_cdata(raw);
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let parsed = DateTime::parse_from_rfc2822(s)
        .or_else(|_| DateTime::parse_from_rfc3339(s))
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"]
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(s, f).ok())
                .map(|n| n.and_utc())
        })?;
    // Whole seconds keep the fingerprint stable across feeds that jitter sub-second digits.
    DateTime::<Utc>::from_timestamp(parsed.timestamp(), 0)
}

fn extract_item(block: &str) -> Option<CandidateItem> {
    let title = capture(&RE_TITLE, block)
        .map(|t| normalize_text(&t))
        .filter(|t| !t.is_empty())?;
    let link = extract_link(block)?;

    let external_id = capture(&RE_GUID, block)
        .or_else(|| capture(&RE_ID, block))
        .and_then(|s| clean_url(&s))
        .unwrap_or_else(|| link.clone());

    let published_at = RE_DATES
        .iter()
        .find_map(|re| capture(re, block))
        .and_then(|raw| parse_published(&raw));

    Some(CandidateItem {
        title,
        link,
        external_id,
        published_at,
    })
}

pub struct FeedParser;

impl ExtractItems for FeedParser {
    fn extract(&self, raw: &str, _source: &Source) -> Vec<CandidateItem> {
        RE_ITEM
            .captures_iter(raw)
            .filter_map(|c| c.get(1))
            .filter_map(|m| extract_item(m.as_str()))
            .collect()
    }
}
