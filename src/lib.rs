// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod bootstrap;
pub mod config;
pub mod ingest;
pub mod metrics;
pub mod notify;
pub mod pipeline;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::bootstrap::{invoke, InvocationResult, Runtime};
pub use crate::config::Config;
pub use crate::pipeline::{Pipeline, RunSummary};
