// src/notify/telegram.rs
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use super::{SendOutcome, Transport};

const TELEGRAM_API: &str = "https://api.telegram.org";
const TELEGRAM_MAX_LEN: usize = 4096;

pub struct TelegramBot {
    api_base: String,
    token: String,
    chat_id: String,
    client: Client,
}

impl TelegramBot {
    pub fn new(token: String, chat_id: String) -> Self {
        Self {
            api_base: TELEGRAM_API.to_string(),
            token,
            chat_id,
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Point at another Bot API host (self-hosted server, tests).
    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base = base.trim_end_matches('/').to_string();
        self
    }
}

#[derive(Deserialize, Default)]
struct ApiError {
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Deserialize, Default)]
struct ResponseParameters {
    retry_after: Option<u64>,
}

#[async_trait]
impl Transport for TelegramBot {
    async fn send(&self, text: &str) -> SendOutcome {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.token);
        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
            "disable_web_page_preview": true,
        });
        let rsp = match self.client.post(&url).json(&body).send().await {
            Ok(rsp) => rsp,
            // The error's URL embeds the token; keep only the kind.
            Err(e) => {
                return SendOutcome::Failed(format!(
                    "Telegram request failed (timeout={}, connect={})",
                    e.is_timeout(),
                    e.is_connect()
                ))
            }
        };

        let status = rsp.status();
        if status.is_success() {
            return SendOutcome::Sent;
        }
        let err: ApiError = rsp.json().await.unwrap_or_default();
        if status == StatusCode::TOO_MANY_REQUESTS {
            let secs = err.parameters.and_then(|p| p.retry_after).unwrap_or(1);
            return SendOutcome::RateLimited {
                retry_after: Duration::from_secs(secs),
            };
        }
        SendOutcome::Failed(format!(
            "Telegram HTTP {status}: {}",
            err.description.unwrap_or_default()
        ))
    }

    fn max_len(&self) -> usize {
        TELEGRAM_MAX_LEN
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    #[tokio::test]
    async fn sends_to_chat_and_reads_retry_after() {
        let app = Router::new().route(
            "/{bot}/sendMessage",
            post(|Path(bot): Path<String>, Json(v): Json<Value>| async move {
                if bot == "botlimited" {
                    return (
                        StatusCode::TOO_MANY_REQUESTS,
                        Json(json!({"ok": false, "error_code": 429, "parameters": {"retry_after": 3}})),
                    );
                }
                if v["chat_id"] != "42" {
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(json!({"ok": false, "description": "chat not found"})),
                    );
                }
                (StatusCode::OK, Json(json!({"ok": true})))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        let base = format!("http://{addr}");

        let ok = TelegramBot::new("good".into(), "42".into()).with_api_base(&base);
        assert_eq!(ok.send("hi").await, SendOutcome::Sent);

        let limited = TelegramBot::new("limited".into(), "42".into()).with_api_base(&base);
        assert_eq!(
            limited.send("hi").await,
            SendOutcome::RateLimited {
                retry_after: Duration::from_secs(3)
            }
        );

        let wrong_chat = TelegramBot::new("good".into(), "7".into()).with_api_base(&base);
        match wrong_chat.send("hi").await {
            SendOutcome::Failed(msg) => assert!(msg.contains("chat not found")),
            other => panic!("unexpected: {other:?}"),
        }
    }
}
