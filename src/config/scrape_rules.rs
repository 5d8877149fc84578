// src/config/scrape_rules.rs
use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const ENV_SCRAPE_RULES_PATH: &str = "SCRAPE_RULES_PATH";

/// "Detail page" shape for one origin: links on that origin are kept only if
/// their path contains one of `paths`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ScrapeRule {
    pub origin: String,
    pub paths: Vec<String>,
}

impl ScrapeRule {
    pub fn matches(&self, url: &str, path: &str) -> bool {
        url.contains(&self.origin) && self.paths.iter().any(|p| path.contains(p.as_str()))
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct ScrapeRules {
    #[serde(default, rename = "rule")]
    pub rules: Vec<ScrapeRule>,
}

impl ScrapeRules {
    /// First rule whose origin substring occurs in the page URL.
    pub fn rule_for(&self, page_url: &str) -> Option<&ScrapeRule> {
        self.rules.iter().find(|r| page_url.contains(&r.origin))
    }
}

/// Load rules from an explicit path. Supports TOML or JSON.
pub fn load_rules_from(path: &Path) -> Result<ScrapeRules> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading scrape rules from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_rules(&content, ext.as_str())
}

/// Load rules using env var + fallbacks:
/// 1) $SCRAPE_RULES_PATH
/// 2) config/scrape_rules.toml
/// 3) config/scrape_rules.json
///
/// No file at all means no rules.
pub fn load_rules_default() -> Result<ScrapeRules> {
    if let Ok(p) = std::env::var(ENV_SCRAPE_RULES_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_rules_from(&pb);
        }
        return Err(anyhow!("{ENV_SCRAPE_RULES_PATH} points to non-existent path"));
    }
    for candidate in ["config/scrape_rules.toml", "config/scrape_rules.json"] {
        let p = PathBuf::from(candidate);
        if p.exists() {
            return load_rules_from(&p);
        }
    }
    Ok(ScrapeRules::default())
}

fn parse_rules(s: &str, hint_ext: &str) -> Result<ScrapeRules> {
    let parsed = if hint_ext == "json" {
        parse_json(s).or_else(|_| parse_toml(s))
    } else {
        parse_toml(s).or_else(|_| parse_json(s))
    };
    parsed.map_err(|_| anyhow!("unsupported scrape rules format"))
}

fn parse_toml(s: &str) -> Result<ScrapeRules> {
    let v: ScrapeRules = toml::from_str(s)?;
    Ok(clean(v.rules))
}

fn parse_json(s: &str) -> Result<ScrapeRules> {
    let v: Vec<ScrapeRule> = serde_json::from_str(s)?;
    Ok(clean(v))
}

fn clean(items: Vec<ScrapeRule>) -> ScrapeRules {
    let rules = items
        .into_iter()
        .filter_map(|r| {
            let origin = r.origin.trim().to_string();
            let paths: Vec<String> = r
                .paths
                .iter()
                .map(|p| p.trim().to_string())
                .filter(|p| !p.is_empty())
                .collect();
            (!origin.is_empty() && !paths.is_empty()).then_some(ScrapeRule { origin, paths })
        })
        .collect();
    ScrapeRules { rules }
}
