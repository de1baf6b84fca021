//! # Dormwatch
//!
//! One scheduled check of the dorm power balances: fetch every room, notify
//! on status changes, persist the snapshot, publish page data and write a run
//! summary.
//!
//! Configuration comes from the environment only (see `Config::from_env`).
//! The summary always goes to stdout and, when `GITHUB_STEP_SUMMARY` is set,
//! is appended to that file. Exit status is non-zero only for fatal errors.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use dormwatch_channels::slots_from_config;
use dormwatch_core::Config;
use dormwatch_monitor::Monitor;
use dormwatch_monitor::report::render_failure;
use dormwatch_providers::PortalClient;
use tracing_subscriber::EnvFilter;

fn append_summary(path: &Path, report: &str) -> Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open summary file {}", path.display()))?;
    writeln!(file, "{report}").with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

fn publish(report: &str, summary_path: Option<&Path>) {
    println!("{report}");
    if let Some(path) = summary_path
        && let Err(e) = append_summary(path, report)
    {
        tracing::warn!("⚠️ Job summary not written: {e:#}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dormwatch=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("🏠 Dormwatch v{}", env!("CARGO_PKG_VERSION"));

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ {e}");
            let summary = std::env::var_os("GITHUB_STEP_SUMMARY").map(std::path::PathBuf::from);
            publish(&render_failure(&e, &[]), summary.as_deref());
            std::process::exit(1);
        }
    };

    let source = PortalClient::from_config(&config);
    let slots = slots_from_config(&config);

    let summary_path = config.summary_path.clone();
    let monitor = Monitor::new(config, Box::new(source), slots);
    let outcome = monitor.run().await;

    publish(&outcome.report, summary_path.as_deref());

    if outcome.fatal.is_some() {
        std::process::exit(1);
    }
    Ok(())
}
