// src/notify/discord.rs
use async_trait::async_trait;
use reqwest::{header::RETRY_AFTER, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{SendOutcome, Transport};

const DISCORD_MAX_LEN: usize = 2000;

#[derive(Clone)]
pub struct DiscordWebhook {
    webhook: String,
    client: Client,
    timeout: Duration,
}

impl DiscordWebhook {
    pub fn new(webhook: String) -> Self {
        Self {
            webhook,
            client: Client::new(),
            timeout: Duration::from_secs(10),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
}

#[derive(Deserialize)]
struct RateLimitBody {
    retry_after: f64,
}

/// Delay from the JSON body (`retry_after`, fractional seconds), else the
/// `Retry-After` header (whole seconds), else one second.
pub(crate) fn retry_after_from(header: Option<&str>, body: &str) -> Duration {
    if let Ok(b) = serde_json::from_str::<RateLimitBody>(body) {
        // Out-of-range values (negative, NaN, larger than a Duration) fall through.
        if let Ok(d) = Duration::try_from_secs_f64(b.retry_after) {
            return d;
        }
    }
    header
        .and_then(|h| h.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(Duration::from_secs(1))
}

#[async_trait]
impl Transport for DiscordWebhook {
    async fn send(&self, text: &str) -> SendOutcome {
        let res = self
            .client
            .post(&self.webhook)
            .timeout(self.timeout)
            .json(&WebhookPayload { content: text })
            .send()
            .await;

        let rsp = match res {
            Ok(rsp) => rsp,
            Err(e) => return SendOutcome::Failed(format!("Discord webhook request failed: {e}")),
        };

        let status = rsp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let header = rsp
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = rsp.text().await.unwrap_or_default();
            return SendOutcome::RateLimited {
                retry_after: retry_after_from(header.as_deref(), &body),
            };
        }
        if !status.is_success() {
            return SendOutcome::Failed(format!("Discord webhook HTTP error: {status}"));
        }
        SendOutcome::Sent
    }

    fn max_len(&self) -> usize {
        DISCORD_MAX_LEN
    }

    fn name(&self) -> &'static str {
        "discord"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    #[test]
    fn retry_after_prefers_body_then_header() {
        assert_eq!(
            retry_after_from(Some("9"), r#"{"message":"slow down","retry_after":1.5,"global":false}"#),
            Duration::from_millis(1500)
        );
        assert_eq!(retry_after_from(Some("4"), "not json"), Duration::from_secs(4));
        assert_eq!(retry_after_from(None, ""), Duration::from_secs(1));
    }

    #[test]
    fn unrepresentable_retry_after_falls_back() {
        assert_eq!(
            retry_after_from(Some("3"), r#"{"retry_after":1e300}"#),
            Duration::from_secs(3)
        );
        assert_eq!(
            retry_after_from(None, r#"{"retry_after":-2.0}"#),
            Duration::from_secs(1)
        );
    }

    #[tokio::test]
    async fn maps_statuses_to_outcomes() {
        let app = Router::new()
            .route(
                "/ok",
                post(|Json(v): Json<Value>| async move {
                    assert_eq!(v["content"], "hello");
                    StatusCode::NO_CONTENT
                }),
            )
            .route(
                "/limited",
                post(|| async {
                    (
                        StatusCode::TOO_MANY_REQUESTS,
                        Json(json!({"retry_after": 2.0, "global": false})),
                    )
                }),
            )
            .route("/bad", post(|| async { StatusCode::BAD_REQUEST }))
            .route(
                "/slow",
                post(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    StatusCode::NO_CONTENT
                }),
            );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let ok = DiscordWebhook::new(format!("http://{addr}/ok"));
        assert_eq!(ok.send("hello").await, SendOutcome::Sent);

        let limited = DiscordWebhook::new(format!("http://{addr}/limited"));
        assert_eq!(
            limited.send("hello").await,
            SendOutcome::RateLimited {
                retry_after: Duration::from_secs(2)
            }
        );

        let bad = DiscordWebhook::new(format!("http://{addr}/bad"));
        assert!(matches!(bad.send("hello").await, SendOutcome::Failed(_)));

        let slow = DiscordWebhook::new(format!("http://{addr}/slow"))
            .with_timeout(Duration::from_millis(100));
        assert!(matches!(slow.send("hello").await, SendOutcome::Failed(_)));
    }
}
