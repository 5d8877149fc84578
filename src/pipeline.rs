// src/pipeline.rs
//! # Run orchestration
//! One invocation: select sources → fetch → parse → dedup → persist, then a
//! single batched notification. Work is strictly sequential.
//!
//! Phases: `init → selecting_sources → processing_source* → notifying → done`,
//! or `aborted` when the time budget runs out. Either budget (elapsed time,
//! accepted items) truncates the remaining work, but whatever was already
//! persisted is always notified. Only configuration and store query errors
//! fail a run; everything else is contained to its source or item.

use chrono::Utc;
use metrics::{counter, gauge};
use serde::Serialize;
use std::sync::Arc;
use tokio::time::{Duration, Instant};

use crate::config::scrape_rules::ScrapeRules;
use crate::config::{Config, ConfigError, MessengerConfig, RunSettings};
use crate::ingest::dedup::Deduplicator;
use crate::ingest::fetcher::{ContentFetcher, FetchError, HttpFetcher};
use crate::ingest::fingerprint::fingerprint_item;
use crate::ingest::parse::extract_candidates;
use crate::ingest::scheduler::{eligible_sources, minute_epoch, select_window};
use crate::ingest::types::{NewItemSummary, Source, StoredItem};
use crate::notify::discord::DiscordWebhook;
use crate::notify::telegram::TelegramBot;
use crate::notify::{compose_message, Notifier, Transport};
use crate::store::rest::RestStore;
use crate::store::{self, Store, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("store query failed: {0}")]
    Store(#[from] StoreError),
    #[error("http client setup failed: {0}")]
    Client(#[from] FetchError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Init,
    SelectingSources,
    ProcessingSource,
    Notifying,
    Done,
    Aborted,
}

/// Which budget cut the run short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetStop {
    TimeBudgetExceeded,
    ItemBudgetReached,
}

/// Elapsed-time and item ceilings for one invocation.
#[derive(Debug, Clone)]
pub struct RunBudget {
    started: Instant,
    time_limit: Duration,
    max_sources: usize,
    max_new_items: usize,
}

impl RunBudget {
    pub fn start(settings: &RunSettings) -> Self {
        Self {
            started: Instant::now(),
            time_limit: settings.time_budget,
            max_sources: settings.max_sources,
            max_new_items: settings.max_new_items,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Checked before each source and each candidate.
    pub fn check(&self, accepted: usize) -> Option<BudgetStop> {
        if self.elapsed() >= self.time_limit {
            Some(BudgetStop::TimeBudgetExceeded)
        } else if accepted >= self.max_new_items {
            Some(BudgetStop::ItemBudgetReached)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceSkip {
    pub source: String,
    pub reason: String,
}

/// Structured result handed back to whatever triggered the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub ok: bool,
    pub sources: Vec<String>,
    pub new_count: usize,
    pub elapsed_ms: u64,
    pub final_state: RunPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncated_by: Option<BudgetStop>,
    pub skipped: Vec<SourceSkip>,
    pub notified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notify_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunSummary {
    /// Summary for a run that could not start (e.g. bad configuration).
    pub fn failed(error: impl std::fmt::Display) -> Self {
        Self {
            ok: false,
            sources: Vec::new(),
            new_count: 0,
            elapsed_ms: 0,
            final_state: RunPhase::Aborted,
            truncated_by: None,
            skipped: Vec::new(),
            notified: false,
            notify_error: None,
            error: Some(error.to_string()),
        }
    }
}

/// Mutable state of a run in progress.
struct RunState {
    phase: RunPhase,
    sources: Vec<String>,
    skipped: Vec<SourceSkip>,
    queued: Vec<NewItemSummary>,
    stop: Option<BudgetStop>,
    error: Option<RunError>,
}

impl RunState {
    fn new() -> Self {
        Self {
            phase: RunPhase::Init,
            sources: Vec::new(),
            skipped: Vec::new(),
            queued: Vec::new(),
            stop: None,
            error: None,
        }
    }

    fn enter(&mut self, phase: RunPhase) {
        tracing::debug!(from = ?self.phase, to = ?phase, "run phase");
        self.phase = phase;
    }

    fn skip(&mut self, source: &Source, reason: impl Into<String>) {
        self.skipped.push(SourceSkip {
            source: source.name.clone(),
            reason: reason.into(),
        });
    }
}

pub struct Pipeline {
    store: Arc<dyn Store>,
    fetcher: Arc<dyn ContentFetcher>,
    notifier: Notifier<Arc<dyn Transport>>,
    rules: ScrapeRules,
    settings: RunSettings,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn Store>,
        fetcher: Arc<dyn ContentFetcher>,
        transport: Arc<dyn Transport>,
        rules: ScrapeRules,
        settings: RunSettings,
    ) -> Self {
        let notifier = Notifier::new(transport)
            .with_max_attempts(settings.notify_max_attempts)
            .with_retry_margin(settings.notify_retry_margin);
        Self {
            store,
            fetcher,
            notifier,
            rules,
            settings,
        }
    }

    /// Wire the HTTP store, fetcher and the configured messenger.
    pub fn from_config(cfg: &Config, rules: ScrapeRules) -> Result<Self, RunError> {
        let settings = cfg.settings.clone();
        let store = RestStore::new(&cfg.store_url, &cfg.store_api_key, settings.fetch_timeout)?;
        let fetcher = HttpFetcher::new(&settings.user_agent, settings.fetch_timeout)?;
        let transport: Arc<dyn Transport> = match &cfg.messenger {
            MessengerConfig::Discord { webhook_url } => {
                Arc::new(
                    DiscordWebhook::new(webhook_url.clone()).with_timeout(settings.fetch_timeout),
                )
            }
            MessengerConfig::Telegram { bot_token, chat_id } => {
                Arc::new(TelegramBot::new(bot_token.clone(), chat_id.clone()))
            }
        };
        Ok(Self::new(
            Arc::new(store),
            Arc::new(fetcher),
            transport,
            rules,
            settings,
        ))
    }

    pub async fn run(&self) -> RunSummary {
        self.run_at(minute_epoch(Utc::now())).await
    }

    /// Run once with an explicit rotation epoch.
    pub async fn run_at(&self, epoch: u64) -> RunSummary {
        crate::metrics::ensure_metrics_described();
        counter!("sentinel_runs_total").increment(1);

        let budget = RunBudget::start(&self.settings);
        let mut run = RunState::new();

        run.enter(RunPhase::SelectingSources);
        match store::enabled_sources(self.store.as_ref()).await {
            Ok(all) => {
                let eligible = eligible_sources(&all, &self.settings.placeholder_marker);
                let window = select_window(&eligible, epoch, budget.max_sources);
                tracing::info!(
                    epoch,
                    eligible = eligible.len(),
                    selected = window.len(),
                    "sources selected"
                );
                self.process_sources(&window, &budget, &mut run).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "loading sources failed");
                run.error = Some(RunError::Store(e));
            }
        }

        run.enter(RunPhase::Notifying);
        let (notified, notify_error) = self.flush(&run.queued).await;

        let aborted =
            run.error.is_some() || run.stop == Some(BudgetStop::TimeBudgetExceeded);
        run.enter(if aborted { RunPhase::Aborted } else { RunPhase::Done });

        let elapsed_ms = budget.elapsed().as_millis() as u64;
        gauge!("sentinel_last_run_ts").set(Utc::now().timestamp() as f64);

        let summary = RunSummary {
            ok: run.error.is_none(),
            sources: run.sources,
            new_count: run.queued.len(),
            elapsed_ms,
            final_state: run.phase,
            truncated_by: run.stop,
            skipped: run.skipped,
            notified,
            notify_error,
            error: run.error.map(|e| e.to_string()),
        };
        tracing::info!(
            ok = summary.ok,
            new = summary.new_count,
            sources = summary.sources.len(),
            elapsed_ms,
            "run finished"
        );
        summary
    }

    async fn process_sources(&self, window: &[Source], budget: &RunBudget, run: &mut RunState) {
        let mut dedup = Deduplicator::new(self.settings.dedup_lookback);
        for source in window {
            if let Some(stop) = budget.check(run.queued.len()) {
                tracing::info!(?stop, "budget reached before next source");
                run.stop = Some(stop);
                return;
            }
            run.enter(RunPhase::ProcessingSource);
            run.sources.push(source.name.clone());
            counter!("sentinel_sources_polled_total").increment(1);

            if let Err(e) = self.process_source(source, budget, &mut dedup, run).await {
                tracing::error!(source = %source.name, error = %e, "store query failed; abandoning run");
                run.error = Some(e);
                return;
            }
            if run.stop.is_some() {
                return;
            }
        }
    }

    async fn process_source(
        &self,
        source: &Source,
        budget: &RunBudget,
        dedup: &mut Deduplicator,
        run: &mut RunState,
    ) -> Result<(), RunError> {
        let raw = match self.fetcher.fetch(&source.url).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(source = %source.name, error = %e, "skipping source");
                run.skip(source, format!("fetch: {e}"));
                return Ok(());
            }
        };

        let candidates = extract_candidates(&raw, source, &self.rules);
        if candidates.is_empty() {
            tracing::debug!(source = %source.name, "no candidates");
            return Ok(());
        }

        dedup.load(self.store.as_ref(), source.id).await?;

        for cand in candidates {
            if let Some(stop) = budget.check(run.queued.len()) {
                tracing::info!(source = %source.name, ?stop, "budget reached mid-source");
                run.stop = Some(stop);
                return Ok(());
            }

            let fp = fingerprint_item(&cand);
            if !dedup.is_new(source.id, &fp) {
                continue;
            }

            let record = StoredItem::from_candidate(source.id, &cand, fp.clone());
            match store::insert_item(self.store.as_ref(), &record).await {
                Ok(()) => {
                    dedup.record(source.id, &fp);
                    counter!("sentinel_new_items_total").increment(1);
                    run.queued.push(NewItemSummary {
                        source: source.name.clone(),
                        title: cand.title,
                        link: cand.link,
                    });
                }
                Err(StoreError::Conflict { .. }) => {
                    // Another run recorded it first.
                    dedup.record(source.id, &fp);
                    tracing::debug!(source = %source.name, link = %cand.link, "already recorded");
                }
                Err(e) => {
                    counter!("sentinel_insert_errors_total").increment(1);
                    tracing::warn!(source = %source.name, link = %cand.link, error = %e, "insert failed; skipping item");
                }
            }
        }
        Ok(())
    }

    async fn flush(&self, queued: &[NewItemSummary]) -> (bool, Option<String>) {
        if queued.is_empty() {
            return (false, None);
        }
        let text = compose_message(queued, self.notifier.transport().max_len());
        match self.notifier.deliver(&text).await {
            Ok(()) => (true, None),
            Err(e) => (false, Some(e.to_string())),
        }
    }
}
