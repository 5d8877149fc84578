// src/store/rest.rs
//! PostgREST-style HTTP store (`/rest/v1/<resource>?field=eq.value&order=...`).

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

use super::{Filter, Store, StoreError};

pub struct RestStore {
    base_url: String,
    api_key: String,
    client: Client,
}

impl RestStore {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, StoreError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }

    fn endpoint(&self, resource: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, resource)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        req.header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

async fn status_error(resp: reqwest::Response) -> StoreError {
    let status = resp.status().as_u16();
    let body = resp.text().await.unwrap_or_default();
    StoreError::Status {
        status,
        body: body.chars().take(300).collect(),
    }
}

#[async_trait]
impl Store for RestStore {
    async fn query(&self, resource: &str, filter: &Filter) -> Result<Vec<Value>, StoreError> {
        let resp = self
            .authed(self.client.get(self.endpoint(resource)))
            .query(&filter.to_query_pairs())
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(status_error(resp).await);
        }
        resp.json::<Vec<Value>>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))
    }

    async fn insert(&self, resource: &str, record: Value) -> Result<Value, StoreError> {
        let resp = self
            .authed(self.client.post(self.endpoint(resource)))
            .header("Prefer", "return=representation")
            .json(&record)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        if resp.status() == StatusCode::CONFLICT {
            return Err(StoreError::Conflict {
                resource: resource.to_string(),
            });
        }
        if !resp.status().is_success() {
            return Err(status_error(resp).await);
        }

        // `return=representation` answers with a one-element array.
        match resp
            .json::<Value>()
            .await
            .map_err(|e| StoreError::Decode(e.to_string()))?
        {
            Value::Array(mut rows) if !rows.is_empty() => Ok(rows.swap_remove(0)),
            Value::Array(_) => Ok(record),
            other => Ok(other),
        }
    }
}
