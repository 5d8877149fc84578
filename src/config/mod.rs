// src/config/mod.rs
//! Process configuration, resolved once at startup and passed by reference.

pub mod scrape_rules;

use serde::Serialize;
use std::time::Duration;

pub const ENV_STORE_URL: &str = "STORE_URL";
pub const ENV_STORE_API_KEY: &str = "STORE_API_KEY";
pub const ENV_DISCORD_WEBHOOK_URL: &str = "DISCORD_WEBHOOK_URL";
pub const ENV_TELEGRAM_BOT_TOKEN: &str = "TELEGRAM_BOT_TOKEN";
pub const ENV_TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";
pub const ENV_INTROSPECT: &str = "SENTINEL_INTROSPECT";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessengerConfig {
    Discord { webhook_url: String },
    Telegram { bot_token: String, chat_id: String },
}

impl MessengerConfig {
    pub fn name(&self) -> &'static str {
        match self {
            MessengerConfig::Discord { .. } => "discord",
            MessengerConfig::Telegram { .. } => "telegram",
        }
    }
}

/// Tunables bounding one run. Every field has a default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSettings {
    pub max_sources: usize,
    pub max_new_items: usize,
    pub time_budget: Duration,
    pub fetch_timeout: Duration,
    pub dedup_lookback: usize,
    pub notify_max_attempts: u32,
    pub notify_retry_margin: Duration,
    pub placeholder_marker: String,
    pub user_agent: String,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            max_sources: 5,
            max_new_items: 20,
            time_budget: Duration::from_secs(25),
            fetch_timeout: Duration::from_secs(8),
            dedup_lookback: 250,
            notify_max_attempts: 3,
            notify_retry_margin: Duration::from_millis(500),
            placeholder_marker: "example.com".to_string(),
            user_agent: format!("feed-sentinel/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub store_url: String,
    pub store_api_key: String,
    pub messenger: MessengerConfig,
    pub settings: RunSettings,
}

/// Which settings are present, without their values. Returned instead of a
/// run when introspection mode is on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SettingsReport {
    pub introspect: bool,
    pub store_url: bool,
    pub store_api_key: bool,
    pub discord_webhook_url: bool,
    pub telegram_bot_token: bool,
    pub telegram_chat_id: bool,
    pub messenger: Option<&'static str>,
    pub settings: RunSettings,
    pub settings_error: Option<String>,
}

fn present(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn parse_num<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match present(lookup(name)) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
    }
}

fn flag(raw: Option<String>) -> bool {
    matches!(
        present(raw).map(|s| s.to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

impl RunSettings {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let d = RunSettings::default();
        Ok(Self {
            max_sources: parse_num(&lookup, "MAX_SOURCES_PER_RUN", d.max_sources)?,
            max_new_items: parse_num(&lookup, "MAX_NEW_ITEMS_PER_RUN", d.max_new_items)?,
            time_budget: Duration::from_secs(parse_num(
                &lookup,
                "RUN_TIME_BUDGET_SECS",
                d.time_budget.as_secs(),
            )?),
            fetch_timeout: Duration::from_secs(parse_num(
                &lookup,
                "FETCH_TIMEOUT_SECS",
                d.fetch_timeout.as_secs(),
            )?),
            dedup_lookback: parse_num(&lookup, "DEDUP_LOOKBACK", d.dedup_lookback)?,
            notify_max_attempts: parse_num(&lookup, "NOTIFY_MAX_ATTEMPTS", d.notify_max_attempts)?
                .max(1),
            notify_retry_margin: Duration::from_millis(parse_num(
                &lookup,
                "NOTIFY_RETRY_MARGIN_MS",
                d.notify_retry_margin.as_millis() as u64,
            )?),
            // Set but empty switches the placeholder filter off.
            placeholder_marker: lookup("PLACEHOLDER_MARKER")
                .map(|s| s.trim().to_string())
                .unwrap_or(d.placeholder_marker),
            user_agent: present(lookup("SENTINEL_USER_AGENT")).unwrap_or(d.user_agent),
        })
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let store_url =
            present(lookup(ENV_STORE_URL)).ok_or(ConfigError::Missing(ENV_STORE_URL))?;
        if !(store_url.starts_with("http://") || store_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                name: ENV_STORE_URL,
                value: store_url,
            });
        }
        let store_api_key =
            present(lookup(ENV_STORE_API_KEY)).ok_or(ConfigError::Missing(ENV_STORE_API_KEY))?;

        let messenger = if let Some(webhook_url) = present(lookup(ENV_DISCORD_WEBHOOK_URL)) {
            MessengerConfig::Discord { webhook_url }
        } else {
            match (
                present(lookup(ENV_TELEGRAM_BOT_TOKEN)),
                present(lookup(ENV_TELEGRAM_CHAT_ID)),
            ) {
                (Some(bot_token), Some(chat_id)) => MessengerConfig::Telegram { bot_token, chat_id },
                (Some(_), None) => return Err(ConfigError::Missing(ENV_TELEGRAM_CHAT_ID)),
                _ => return Err(ConfigError::Missing(ENV_DISCORD_WEBHOOK_URL)),
            }
        };

        Ok(Self {
            store_url,
            store_api_key,
            messenger,
            settings: RunSettings::from_lookup(&lookup)?,
        })
    }
}

/// Whether introspection mode is switched on.
pub fn introspection_enabled(lookup: impl Fn(&str) -> Option<String>) -> bool {
    flag(lookup(ENV_INTROSPECT))
}

impl SettingsReport {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let has = |k: &str| present(lookup(k)).is_some();
        let discord = has(ENV_DISCORD_WEBHOOK_URL);
        let telegram = has(ENV_TELEGRAM_BOT_TOKEN) && has(ENV_TELEGRAM_CHAT_ID);
        let (settings, settings_error) = match RunSettings::from_lookup(&lookup) {
            Ok(s) => (s, None),
            Err(e) => (RunSettings::default(), Some(e.to_string())),
        };
        Self {
            introspect: introspection_enabled(&lookup),
            store_url: has(ENV_STORE_URL),
            store_api_key: has(ENV_STORE_API_KEY),
            discord_webhook_url: discord,
            telegram_bot_token: has(ENV_TELEGRAM_BOT_TOKEN),
            telegram_chat_id: has(ENV_TELEGRAM_CHAT_ID),
            messenger: if discord {
                Some("discord")
            } else if telegram {
                Some("telegram")
            } else {
                None
            },
            settings,
            settings_error,
        }
    }
}
