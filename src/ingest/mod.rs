// src/ingest/mod.rs
pub mod dedup;
pub mod fetcher;
pub mod fingerprint;
pub mod parse;
pub mod scheduler;
pub mod types;

use once_cell::sync::Lazy;
use regex::Regex;

static RE_CDATA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("cdata regex"));
static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("ws regex"));

/// Unwrap `<![CDATA[...]]>` sections, keeping their contents.
pub fn strip_cdata(s: &str) -> String {
    RE_CDATA.replace_all(s, "$1").into_owned()
}

/// Normalize a title-like fragment: unwrap CDATA, decode entities, strip tags,
/// fold typographic quotes, collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let unwrapped = strip_cdata(s);

    // Decode before stripping so escaped markup (`&lt;b&gt;`) is removed too.
    let decoded = html_escape::decode_html_entities(&unwrapped).to_string();
    let mut out = RE_TAGS.replace_all(&decoded, " ").to_string();

    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    out = RE_WS.replace_all(&out, " ").trim().to_string();

    if out.chars().count() > 300 {
        out = out.chars().take(300).collect();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_collapses_ws_and_decodes() {
        let s = "  Hello,&nbsp;&nbsp; world!  ";
        assert_eq!(normalize_text(s), "Hello, world!");
    }

    #[test]
    fn normalize_text_unwraps_cdata_and_escaped_tags() {
        let s = "<![CDATA[ <b>Patch</b> 1.2 ]]>";
        assert_eq!(normalize_text(s), "Patch 1.2");
        assert_eq!(normalize_text("&lt;i&gt;Hotfix&lt;/i&gt;"), "Hotfix");
    }

    #[test]
    fn normalize_text_folds_smart_quotes() {
        assert_eq!(normalize_text("\u{201C}ok\u{201D} it\u{2019}s"), "\"ok\" it's");
    }
}
