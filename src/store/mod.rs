// src/store/mod.rs
//! Record store boundary.
//!
//! The pipeline only needs two operations, `query` and `insert`, over named
//! resources. Records travel as JSON objects; typed access lives in the
//! helpers at the bottom of this module.

pub mod memory;
pub mod rest;

use async_trait::async_trait;
use serde_json::Value;

use crate::ingest::types::{Source, StoredItem};

pub const SOURCES: &str = "sources";
pub const ITEMS: &str = "items";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The record collides with an existing one (per-source fingerprint uniqueness).
    #[error("duplicate record in {resource}")]
    Conflict { resource: String },
    #[error("store returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("store request failed: {0}")]
    Transport(String),
    #[error("store returned an unexpected payload: {0}")]
    Decode(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

impl Order {
    fn as_str(self) -> &'static str {
        match self {
            Order::Asc => "asc",
            Order::Desc => "desc",
        }
    }
}

/// Equality / ordering / limit predicates over named fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub select: Option<String>,
    pub eq: Vec<(String, Value)>,
    pub order: Option<(String, Order)>,
    pub limit: Option<usize>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.select = Some(columns.to_string());
        self
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.eq.push((field.to_string(), value.into()));
        self
    }

    pub fn order(mut self, field: &str, order: Order) -> Self {
        self.order = Some((field.to_string(), order));
        self
    }

    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Render as path-style query pairs: `field=eq.value`, `order=field.asc`, `limit=N`.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut out = Vec::new();
        if let Some(sel) = &self.select {
            out.push(("select".to_string(), sel.clone()));
        }
        for (field, value) in &self.eq {
            out.push((field.clone(), format!("eq.{}", scalar_text(value))));
        }
        if let Some((field, order)) = &self.order {
            out.push(("order".to_string(), format!("{field}.{}", order.as_str())));
        }
        if let Some(n) = self.limit {
            out.push(("limit".to_string(), n.to_string()));
        }
        out
    }
}

fn scalar_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn query(&self, resource: &str, filter: &Filter) -> Result<Vec<Value>, StoreError>;
    async fn insert(&self, resource: &str, record: Value) -> Result<Value, StoreError>;
}

fn decode<T: serde::de::DeserializeOwned>(v: Value) -> Result<T, StoreError> {
    serde_json::from_value(v).map_err(|e| StoreError::Decode(e.to_string()))
}

/// Enabled sources ordered by id.
pub async fn enabled_sources(store: &dyn Store) -> Result<Vec<Source>, StoreError> {
    let filter = Filter::new()
        .select("*")
        .eq("enabled", true)
        .order("id", Order::Asc);
    store
        .query(SOURCES, &filter)
        .await?
        .into_iter()
        .map(decode)
        .collect()
}

/// Fingerprints of the `lookback` most recently created items of a source.
pub async fn recent_fingerprints(
    store: &dyn Store,
    source_id: i64,
    lookback: usize,
) -> Result<Vec<String>, StoreError> {
    let filter = Filter::new()
        .select("fingerprint")
        .eq("source_id", source_id)
        .order("created_at", Order::Desc)
        .limit(lookback);
    let rows = store.query(ITEMS, &filter).await?;
    Ok(rows
        .into_iter()
        .filter_map(|r| r.get("fingerprint").and_then(Value::as_str).map(str::to_string))
        .collect())
}

/// Persist one item. The echoed row is not read back: once the store accepted
/// it, the item counts as recorded whatever shape the reply has.
pub async fn insert_item(store: &dyn Store, item: &StoredItem) -> Result<(), StoreError> {
    let record = serde_json::to_value(item).map_err(|e| StoreError::Decode(e.to_string()))?;
    store.insert(ITEMS, record).await?;
    Ok(())
}
