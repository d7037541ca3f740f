//! # Main Entry Point
//!
//! Wires the layers together:
//! - Domain: configuration, types, traits and errors
//! - Infrastructure: Telegram and console transports, forecast client, activity log
//! - Application: router, forms, middleware, inbox, logging
//! - Interface: route handlers

mod application;
mod domain;
mod infrastructure;
mod interface;
mod strings;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::application::inbox::Inbox;
use crate::application::middleware::{RequestLogger, UserTracker};
use crate::application::router::RouterBuilder;
use crate::domain::config::AppConfig;
use crate::infrastructure::activity::ActivityLog;
use crate::infrastructure::forecast::HttpForecastService;
use crate::infrastructure::telegram::TelegramBot;
use crate::interface::commands::{self, AppServices};

#[derive(Parser)]
#[command(name = "stockcast")]
#[command(about = "Telegram bot forecasting stock prices through conversational forms")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", default_value = "data/config.yaml")]
    config: PathBuf,

    /// Telegram bot token (overrides the config file)
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Talk to the bot on stdin/stdout instead of Telegram
    #[arg(long)]
    console: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load Configuration
    let mut config = if cli.config.exists() {
        AppConfig::load(&cli.config)?
    } else {
        eprintln!("{} not found, using defaults", cli.config.display());
        AppConfig::default()
    };
    if let Some(token) = cli.token {
        config.services.telegram.token = Some(token);
    }

    // 2. Logging Setup
    let _guard = application::logging::init(&config, !cli.console)?;
    tracing::info!("Starting stockcast v{}...", env!("CARGO_PKG_VERSION"));

    // 3. Infrastructure
    let (activity, activity_writer) = ActivityLog::spawn(config.activity_log_path())?;
    let forecast = Arc::new(HttpForecastService::new(
        &config.services.forecast,
        &config.forecast,
    )?);

    // 4. Router
    let tracker = UserTracker::new();
    let services = Arc::new(AppServices {
        forecast,
        activity,
        tracker: tracker.clone(),
        config: config.clone(),
    });
    let builder = RouterBuilder::new(config.router.clone())
        .middleware(Arc::new(RequestLogger))
        .middleware(Arc::new(tracker));
    let router = Arc::new(
        commands::register(builder, services.clone())
            .context("Failed to register routes")?
            .build(),
    );

    // 5. Transport
    if cli.console {
        infrastructure::console::run(router).await?;
    } else {
        let bot = TelegramBot::new(&config.services.telegram)?;
        let idle = Duration::from_secs(config.router.session_idle_secs);
        let inbox = Arc::new(Inbox::new(router, idle));
        tokio::select! {
            result = bot.run(inbox.clone()) => result?,
            _ = tokio::signal::ctrl_c() => tracing::info!("Shutting down..."),
        }
        inbox.shutdown().await;
    }

    // Flush pending activity records
    drop(services);
    if let Err(e) = activity_writer.await {
        tracing::error!("Activity writer panicked: {}", e);
    }
    Ok(())
}
