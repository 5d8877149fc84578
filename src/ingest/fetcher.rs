// src/ingest/fetcher.rs
use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::Client;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("HTTP {0}")]
    Status(u16),
    #[error("network error: {0}")]
    Network(String),
}

/// Retrieves raw source content. One attempt per call; a failed source waits
/// for the next scheduled run.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

pub struct HttpFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .connect_timeout(timeout.min(Duration::from_secs(4)))
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Network(e.to_string()))?;
        Ok(Self { client, timeout })
    }

    fn map_err(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            FetchError::Timeout(self.timeout)
        } else if let Some(status) = e.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Network(e.to_string())
        }
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let t0 = Instant::now();
        let res = async {
            let resp = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| self.map_err(e))?;
            let status = resp.status();
            if !status.is_success() {
                return Err(FetchError::Status(status.as_u16()));
            }
            resp.text().await.map_err(|e| self.map_err(e))
        }
        .await;

        histogram!("sentinel_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        if let Err(e) = &res {
            tracing::warn!(%url, error = %e, "fetch failed");
            counter!("sentinel_fetch_errors_total").increment(1);
        }
        res
    }
}
