// src/notify/mod.rs
pub mod discord;
pub mod telegram;

use async_trait::async_trait;
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;

use crate::ingest::types::NewItemSummary;

/// Result of a single transport call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    RateLimited { retry_after: Duration },
    Failed(String),
}

#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, text: &str) -> SendOutcome;
    /// Longest message (in chars) the channel accepts.
    fn max_len(&self) -> usize;
    fn name(&self) -> &'static str;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, text: &str) -> SendOutcome {
        (**self).send(text).await
    }
    fn max_len(&self) -> usize {
        (**self).max_len()
    }
    fn name(&self) -> &'static str {
        (**self).name()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("still rate limited after {attempts} attempts")]
    RateLimitExhausted { attempts: u32 },
    #[error("delivery failed: {0}")]
    Failed(String),
}

/// Single-shot delivery with rate-limit backoff.
pub struct Notifier<T> {
    transport: T,
    max_attempts: u32,
    retry_margin: Duration,
}

impl<T: Transport> Notifier<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            max_attempts: 3,
            retry_margin: Duration::from_millis(500),
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_retry_margin(mut self, margin: Duration) -> Self {
        self.retry_margin = margin;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Send `text`, sleeping `retry_after + margin` on each rate-limit answer.
    /// Other failures are returned immediately.
    pub async fn deliver(&self, text: &str) -> Result<(), DeliveryError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            counter!("sentinel_notify_attempts_total").increment(1);
            match self.transport.send(text).await {
                SendOutcome::Sent => return Ok(()),
                SendOutcome::Failed(reason) => {
                    tracing::warn!(transport = self.transport.name(), %reason, "notification failed");
                    return Err(DeliveryError::Failed(reason));
                }
                SendOutcome::RateLimited { retry_after } => {
                    if attempt >= self.max_attempts {
                        tracing::warn!(
                            transport = self.transport.name(),
                            attempts = attempt,
                            "giving up on rate-limited notification"
                        );
                        return Err(DeliveryError::RateLimitExhausted { attempts: attempt });
                    }
                    let wait = retry_after + self.retry_margin;
                    tracing::info!(
                        transport = self.transport.name(),
                        attempt,
                        wait_ms = wait.as_millis() as u64,
                        "rate limited, backing off"
                    );
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }
}

/// One message for the whole run: a count header plus one line per item,
/// cut to `max_len` chars with a trailing "… and N more".
pub fn compose_message(items: &[NewItemSummary], max_len: usize) -> String {
    let header = if items.len() == 1 {
        "1 new item".to_string()
    } else {
        format!("{} new items", items.len())
    };

    let lines: Vec<String> = items
        .iter()
        .map(|it| format!("• [{}] {} - {}", it.source, it.title, it.link))
        .collect();

    let mut out = header;
    let mut used = out.chars().count();
    for (i, line) in lines.iter().enumerate() {
        let remaining = lines.len() - i - 1;
        let tail_len = if remaining > 0 {
            format!("\n… and {remaining} more").chars().count()
        } else {
            0
        };
        let line_len = 1 + line.chars().count();
        if used + line_len + tail_len > max_len {
            let more = lines.len() - i;
            let tail = format!("\n… and {more} more");
            if used + tail.chars().count() <= max_len {
                out.push_str(&tail);
            }
            return out;
        }
        out.push('\n');
        out.push_str(line);
        used += line_len;
    }
    out
}
