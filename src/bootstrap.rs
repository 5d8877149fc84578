// src/bootstrap.rs
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::scrape_rules::load_rules_default;
use crate::config::{introspection_enabled, Config, SettingsReport};
use crate::pipeline::{Pipeline, RunError, RunSummary};

/// What this process can do, decided once at startup.
pub enum Runtime {
    Ready(Arc<Pipeline>),
    /// Report settings presence only; no external service is contacted.
    Introspect(SettingsReport),
    /// Startup failed; every invocation answers with this error.
    Misconfigured(String),
}

impl Runtime {
    pub fn from_env() -> Self {
        if introspection_enabled(|k| std::env::var(k).ok()) {
            info!("introspection mode on; runs will only report settings");
            return Runtime::Introspect(SettingsReport::from_env());
        }

        let cfg = match Config::from_env() {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(error = %e, "configuration incomplete");
                return Runtime::Misconfigured(RunError::Config(e).to_string());
            }
        };
        // Safe diagnostics: no credentials, only shape.
        info!(
            store = %cfg.store_url,
            messenger = cfg.messenger.name(),
            max_sources = cfg.settings.max_sources,
            max_new_items = cfg.settings.max_new_items,
            "config loaded"
        );

        let rules = match load_rules_default() {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "scrape rules unreadable");
                return Runtime::Misconfigured(format!("configuration error: {e:#}"));
            }
        };

        match Pipeline::from_config(&cfg, rules) {
            Ok(p) => Runtime::Ready(Arc::new(p)),
            Err(e) => Runtime::Misconfigured(e.to_string()),
        }
    }
}

/// Result of one invocation, whatever the runtime state.
#[derive(Debug, serde::Serialize)]
#[serde(untagged)]
pub enum InvocationResult {
    Run(RunSummary),
    Introspect(SettingsReport),
}

pub async fn invoke(rt: &Runtime) -> InvocationResult {
    match rt {
        Runtime::Ready(p) => InvocationResult::Run(p.run().await),
        Runtime::Introspect(report) => InvocationResult::Introspect(report.clone()),
        Runtime::Misconfigured(err) => InvocationResult::Run(RunSummary::failed(err)),
    }
}
