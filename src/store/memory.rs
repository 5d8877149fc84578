// src/store/memory.rs
//! In-process store with the same filter semantics and the
//! `(source_id, fingerprint)` uniqueness constraint. Used for dry runs and tests.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Mutex;

use super::{Filter, Order, Store, StoreError, ITEMS};
use crate::ingest::types::Source;

#[derive(Default)]
struct Inner {
    seq: u64,
    tables: HashMap<String, Vec<(u64, Value)>>,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sources(sources: &[Source]) -> Self {
        let store = Self::new();
        for s in sources {
            if let Ok(v) = serde_json::to_value(s) {
                store.seed(super::SOURCES, v);
            }
        }
        store
    }

    /// Insert without constraint checks (fixtures).
    pub fn seed(&self, resource: &str, record: Value) {
        let mut inner = self.lock();
        inner.seq += 1;
        let seq = inner.seq;
        inner
            .tables
            .entry(resource.to_string())
            .or_default()
            .push((seq, record));
    }

    /// Snapshot of a resource in insertion order.
    pub fn records(&self, resource: &str) -> Vec<Value> {
        self.lock()
            .tables
            .get(resource)
            .map(|rows| rows.iter().map(|(_, v)| v.clone()).collect())
            .unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A panic while holding the lock only happens in tests; keep serving.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Null) | None, Some(Value::Null) | None) => Ordering::Equal,
        (Some(Value::Null) | None, _) => Ordering::Less,
        (_, Some(Value::Null) | None) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

fn project(record: &Value, select: Option<&str>) -> Value {
    let Some(cols) = select.filter(|s| s.trim() != "*") else {
        return record.clone();
    };
    let mut out = Map::new();
    for col in cols.split(',').map(str::trim).filter(|c| !c.is_empty()) {
        if let Some(v) = record.get(col) {
            out.insert(col.to_string(), v.clone());
        }
    }
    Value::Object(out)
}

#[async_trait]
impl Store for MemoryStore {
    async fn query(&self, resource: &str, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        let inner = self.lock();
        let mut rows: Vec<&(u64, Value)> = inner
            .tables
            .get(resource)
            .map(|rows| {
                rows.iter()
                    .filter(|(_, r)| {
                        filter.eq.iter().all(|(field, want)| {
                            r.get(field).map(text).as_deref() == Some(text(want).as_str())
                        })
                    })
                    .collect()
            })
            .unwrap_or_default();

        if let Some((field, order)) = &filter.order {
            rows.sort_by(|(sa, a), (sb, b)| {
                let ord = compare(a.get(field), b.get(field)).then(sa.cmp(sb));
                match order {
                    Order::Asc => ord,
                    Order::Desc => ord.reverse(),
                }
            });
        }

        let limit = filter.limit.unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .take(limit)
            .map(|(_, r)| project(r, filter.select.as_deref()))
            .collect())
    }

    async fn insert(&self, resource: &str, record: Value) -> Result<Value, StoreError> {
        let Value::Object(mut obj) = record else {
            return Err(StoreError::Decode("record must be a JSON object".into()));
        };

        let mut inner = self.lock();
        if resource == ITEMS {
            let key = (obj.get("source_id").map(text), obj.get("fingerprint").map(text));
            let dup = inner.tables.get(resource).is_some_and(|rows| {
                rows.iter().any(|(_, r)| {
                    (r.get("source_id").map(text), r.get("fingerprint").map(text)) == key
                })
            });
            if dup {
                return Err(StoreError::Conflict {
                    resource: resource.to_string(),
                });
            }
        }

        inner.seq += 1;
        let seq = inner.seq;
        obj.entry("id").or_insert_with(|| Value::from(seq));
        obj.entry("created_at")
            .or_insert_with(|| Value::from(Utc::now().to_rfc3339()));
        let stored = Value::Object(obj);
        inner
            .tables
            .entry(resource.to_string())
            .or_default()
            .push((seq, stored.clone()));
        Ok(stored)
    }
}
