//! Handles settings for the application. Configuration is read from
//! `settings.toml`, every key can be overridden with a `PUNYA__` environment
//! variable (e.g. `PUNYA__SERVER__PORT=8080`).
//!
//! See `settings.toml` for an example.
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use engine::{EngineOptions, RetryPolicy};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for App {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Notification {
    pub timeout_ms: u64,
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    /// Where notifications are POSTed. Logged only when absent.
    pub webhook_url: Option<String>,
}

impl Default for Notification {
    fn default() -> Self {
        Self {
            timeout_ms: 5_000,
            max_retries: 3,
            initial_backoff_ms: 100,
            webhook_url: None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Engine {
    pub operation_timeout_ms: u64,
    pub max_redemption_percent: i64,
    pub notification: Notification,
}

impl Default for Engine {
    fn default() -> Self {
        Self {
            operation_timeout_ms: 10_000,
            max_redemption_percent: 80,
            notification: Notification::default(),
        }
    }
}

impl Engine {
    pub fn options(&self) -> EngineOptions {
        EngineOptions {
            operation_timeout: Duration::from_millis(self.operation_timeout_ms),
            max_redemption_percent: self.max_redemption_percent,
            notification_timeout: Duration::from_millis(self.notification.timeout_ms),
            notification_retry: RetryPolicy {
                max_retries: self.notification.max_retries,
                initial_delay: Duration::from_millis(self.notification.initial_backoff_ms),
                ..RetryPolicy::default()
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub app: App,
    pub server: Option<Server>,
    #[serde(default)]
    pub engine: Engine,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings").required(false))
            .add_source(Environment::with_prefix("PUNYA").separator("__"))
            .build()?;

        settings.try_deserialize()
    }
}
