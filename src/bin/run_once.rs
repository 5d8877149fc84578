//! Run the pipeline once and print the summary JSON (cron-style trigger).
//! Exits 0 when the run succeeded, 1 otherwise; the summary is printed either way.

use anyhow::Context;
use feed_sentinel::{invoke, InvocationResult, Runtime};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("feed_sentinel=info,warn")),
        )
        .init();

    let runtime = Runtime::from_env();
    let result = invoke(&runtime).await;

    let out = serde_json::to_string_pretty(&result).context("serialize run summary")?;
    println!("{out}");

    let ok = match &result {
        InvocationResult::Run(summary) => summary.ok,
        InvocationResult::Introspect(_) => true,
    };
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}
