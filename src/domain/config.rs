//! # Configuration
//!
//! Manages the loading and parsing of the application's configuration file (`config.yaml`).
//! Defines the structs for transport, forecast service, routing and system settings.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration structure.
/// Matches the layout of `data/config.yaml`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub services: ServicesConfig,
    #[serde(default)]
    pub system: SystemConfig,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
}

impl AppConfig {
    /// Reads and parses the YAML configuration at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn data_dir(&self) -> PathBuf {
        PathBuf::from(&self.system.data_dir)
    }

    pub fn activity_log_path(&self) -> PathBuf {
        self.data_dir().join(&self.system.activity_log)
    }
}

/// Configuration for the connected services.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ServicesConfig {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub forecast: ForecastServiceConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TelegramConfig {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_telegram_api")]
    pub api_url: String,
    /// Long-polling timeout for `getUpdates`, in seconds.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: default_telegram_api(),
            poll_timeout: default_poll_timeout(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ForecastServiceConfig {
    #[serde(default = "default_forecast_endpoint")]
    pub endpoint: String,
    /// Request timeout in seconds. Model training is slow, so this is generous.
    #[serde(default = "default_forecast_timeout")]
    pub timeout: u64,
}

impl Default for ForecastServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_forecast_endpoint(),
            timeout: default_forecast_timeout(),
        }
    }
}

/// System-level settings for the bot.
#[derive(Debug, Deserialize, Clone)]
pub struct SystemConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_activity_log")]
    pub activity_log: String,
    #[serde(default = "default_log_file")]
    pub log_file: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            activity_log: default_activity_log(),
            log_file: default_log_file(),
        }
    }
}

/// Which key the active form is stored under.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FormScope {
    /// One active form per conversation.
    #[default]
    Session,
    /// A single active form shared by every conversation (single-tenant mode).
    Global,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RouterConfig {
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
    #[serde(default)]
    pub form_scope: FormScope,
    /// Seconds a session worker waits for the next event before it exits.
    #[serde(default = "default_session_idle_secs")]
    pub session_idle_secs: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_redirects: default_max_redirects(),
            form_scope: FormScope::default(),
            session_idle_secs: default_session_idle_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ForecastConfig {
    #[serde(default = "default_historical_years")]
    pub historical_years: u32,
    #[serde(default = "default_forecast_days")]
    pub forecast_days: u32,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            historical_years: default_historical_years(),
            forecast_days: default_forecast_days(),
        }
    }
}

fn default_telegram_api() -> String {
    "https://api.telegram.org".to_string()
}
fn default_poll_timeout() -> u64 {
    30
}
fn default_forecast_endpoint() -> String {
    "http://127.0.0.1:8000".to_string()
}
fn default_forecast_timeout() -> u64 {
    600
}
fn default_data_dir() -> String {
    "data".to_string()
}
fn default_activity_log() -> String {
    "activity.jsonl".to_string()
}
fn default_log_file() -> String {
    "session.log".to_string()
}
fn default_max_redirects() -> usize {
    4
}
fn default_session_idle_secs() -> u64 {
    300
}
fn default_historical_years() -> u32 {
    2
}
fn default_forecast_days() -> u32 {
    30
}
