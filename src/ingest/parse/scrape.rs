// src/ingest/parse/scrape.rs
//! Link scraping for plain HTML pages.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use url::Url;

use super::ExtractItems;
use crate::config::scrape_rules::ScrapeRules;
use crate::ingest::types::{CandidateItem, Source};

static RE_ANCHOR_HREF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a\b[^>]*?\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
        .expect("anchor regex")
});

/// Raw `href` values of every `<a>` tag, in document order.
pub fn raw_hrefs(html: &str) -> Vec<String> {
    RE_ANCHOR_HREF
        .captures_iter(html)
        .filter_map(|c| c.get(1).or_else(|| c.get(2)).or_else(|| c.get(3)))
        .map(|m| html_escape::decode_html_entities(m.as_str().trim()).to_string())
        .collect()
}

/// Resolve `href` against `base`, dropping anchors, script links and
/// non-HTTP(S) targets. The fragment is removed from the result.
pub fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }
    if href.to_ascii_lowercase().starts_with("javascript:") {
        return None;
    }
    let mut abs = base.join(href).ok()?;
    if !matches!(abs.scheme(), "http" | "https") {
        return None;
    }
    abs.set_fragment(None);
    Some(abs)
}

pub struct PageScraper<'a> {
    pub rules: &'a ScrapeRules,
}

impl PageScraper<'_> {
    /// Absolute detail-page links on `html`, de-duplicated in discovery order.
    pub fn links(&self, html: &str, page_url: &str) -> Vec<String> {
        let Ok(base) = Url::parse(page_url) else {
            tracing::warn!(url = %page_url, "scrape source has an invalid url");
            return Vec::new();
        };
        let Some(rule) = self.rules.rule_for(page_url) else {
            tracing::warn!(url = %page_url, "no scrape rule for this page; nothing kept");
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for href in raw_hrefs(html) {
            let Some(abs) = resolve_link(&base, &href) else {
                continue;
            };
            if abs == base {
                continue;
            }
            if rule.matches(abs.as_str(), abs.path()) && seen.insert(abs.to_string()) {
                out.push(abs.to_string());
            }
        }
        out
    }
}

impl ExtractItems for PageScraper<'_> {
    fn extract(&self, raw: &str, source: &Source) -> Vec<CandidateItem> {
        self.links(raw, &source.url)
            .into_iter()
            .map(|link| CandidateItem {
                title: source.name.clone(),
                external_id: link.clone(),
                link,
                published_at: None,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::scrape_rules::ScrapeRule;
    use crate::ingest::types::SourceKind;

    fn rules() -> ScrapeRules {
        ScrapeRules {
            rules: vec![ScrapeRule {
                origin: "studio.test".into(),
                paths: vec!["/news/".into(), "/patch-notes/".into()],
            }],
        }
    }

    fn page(url: &str) -> Source {
        Source {
            id: 7,
            name: "Studio news".into(),
            kind: SourceKind::PageScrape,
            url: url.into(),
            enabled: true,
        }
    }

    const HTML: &str = r##"
        <nav><a href="/">Home</a> <a href="#top">Top</a></nav>
        <a class="card" href="/news/2025/launch">Launch</a>
        <A HREF='patch-notes/1-2'>1.2</A>
        <a href="javascript:void(0)">menu</a>
        <a href="mailto:press@studio.test">press</a>
        <a href="/news/2025/launch#comments">again</a>
        <a href="https://other.test/news/x">elsewhere</a>
        <a href=/news/unquoted>unquoted</a>
        <a href="/about">About</a>
    "##;

    #[test]
    fn keeps_allow_listed_detail_links_in_order() {
        let rules = rules();
        let scraper = PageScraper { rules: &rules };
        let links = scraper.links(HTML, "https://studio.test/");
        assert_eq!(
            links,
            vec![
                "https://studio.test/news/2025/launch",
                "https://studio.test/patch-notes/1-2",
                "https://studio.test/news/unquoted",
            ]
        );
    }

    #[test]
    fn items_use_source_name_and_link_identity() {
        let rules = rules();
        let scraper = PageScraper { rules: &rules };
        let items = scraper.extract(HTML, &page("https://studio.test/"));
        assert_eq!(items.len(), 3);
        for it in &items {
            assert_eq!(it.title, "Studio news");
            assert_eq!(it.external_id, it.link);
            assert!(it.published_at.is_none());
        }
    }

    #[test]
    fn without_a_matching_rule_nothing_is_kept() {
        let empty = ScrapeRules::default();
        let scraper = PageScraper { rules: &empty };
        assert!(scraper.links(HTML, "https://studio.test/").is_empty());

        let rules = rules();
        let scraper = PageScraper { rules: &rules };
        assert!(scraper.links(HTML, "https://elsewhere.test/").is_empty());
    }

    #[test]
    fn relative_links_resolve_against_page_path() {
        let base = Url::parse("https://studio.test/blog/index.html").unwrap();
        let abs = resolve_link(&base, "post-1.html").unwrap();
        assert_eq!(abs.as_str(), "https://studio.test/blog/post-1.html");
        assert!(resolve_link(&base, "#x").is_none());
        assert!(resolve_link(&base, "JavaScript:alert(1)").is_none());
        assert!(resolve_link(&base, "tel:123").is_none());
    }

    #[test]
    fn invalid_page_url_yields_nothing() {
        let rules = ScrapeRules::default();
        let scraper = PageScraper { rules: &rules };
        assert!(scraper.links(HTML, "not a url").is_empty());
    }
}
