// src/api.rs
use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;

use crate::bootstrap::{invoke, InvocationResult, Runtime};

#[derive(Clone)]
pub struct AppState {
    runtime: Arc<Runtime>,
    // Overlapping triggers on one process run one after another.
    run_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(runtime: Runtime) -> Self {
        Self {
            runtime: Arc::new(runtime),
            run_lock: Arc::new(Mutex::new(())),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/run", get(run).post(run))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

async fn run(State(state): State<AppState>) -> Json<InvocationResult> {
    let _guard = state.run_lock.lock().await;
    Json(invoke(&state.runtime).await)
}
