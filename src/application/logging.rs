//! # Logging Setup
//!
//! `tracing` subscriber with an `EnvFilter`, a non-blocking file layer that is always
//! on, and a stdout layer that is dropped when the console transport owns the terminal.

use anyhow::{Context, Result};
use std::fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::domain::config::AppConfig;

const DEFAULT_FILTER: &str = "info,reqwest=warn,hyper=warn";

/// Installs the global subscriber. Keep the returned guard alive for the whole
/// process or buffered file lines are lost.
pub fn init(config: &AppConfig, stdout: bool) -> Result<WorkerGuard> {
    let data_dir = config.data_dir();
    fs::create_dir_all(&data_dir)
        .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

    // Clear previous session log
    let log_path = data_dir.join(&config.system.log_file);
    if log_path.exists() {
        let _ = fs::remove_file(&log_path);
    }

    let file_appender = tracing_appender::rolling::never(&data_dir, &config.system.log_file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false);

    let console_layer = stdout.then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stdout));

    tracing_subscriber::registry()
        .with(env_filter())
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}
