// src/ingest/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How a source's content is turned into candidates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    /// RSS or Atom markup.
    Feed,
    /// Plain HTML page whose outbound links are the items.
    PageScrape,
}

/// A configured origin, as stored in the `sources` resource.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Source {
    pub id: i64,
    pub name: String,
    pub kind: SourceKind,
    pub url: String,
    #[serde(default)]
    pub enabled: bool,
}

/// Item extracted from raw content, not yet checked against history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateItem {
    pub title: String,
    pub link: String,
    /// Native id (guid / Atom id) or the link itself.
    pub external_id: String,
    pub published_at: Option<DateTime<Utc>>,
}

/// Record written to the `items` resource. `created_at` is assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredItem {
    pub source_id: i64,
    pub title: String,
    pub link: String,
    pub published_at: Option<DateTime<Utc>>,
    pub external_id: String,
    pub fingerprint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl StoredItem {
    pub fn from_candidate(source_id: i64, item: &CandidateItem, fingerprint: String) -> Self {
        Self {
            source_id,
            title: item.title.clone(),
            link: item.link.clone(),
            published_at: item.published_at,
            external_id: item.external_id.clone(),
            fingerprint,
            created_at: None,
        }
    }
}

/// Queued line for the end-of-run notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItemSummary {
    pub source: String,
    pub title: String,
    pub link: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_kind_uses_kebab_case_on_the_wire() {
        let s: Source = serde_json::from_str(
            r#"{"id":3,"name":"Blog","kind":"page-scrape","url":"https://b.test/","enabled":true}"#,
        )
        .unwrap();
        assert_eq!(s.kind, SourceKind::PageScrape);
        assert_eq!(
            serde_json::to_value(SourceKind::Feed).unwrap(),
            serde_json::json!("feed")
        );
    }

    #[test]
    fn new_record_omits_created_at() {
        let cand = CandidateItem {
            title: "T".into(),
            link: "https://x/1".into(),
            external_id: "https://x/1".into(),
            published_at: None,
        };
        let v = serde_json::to_value(StoredItem::from_candidate(1, &cand, "ab".into())).unwrap();
        assert!(v.get("created_at").is_none());
        assert_eq!(v["published_at"], serde_json::Value::Null);
    }
}
