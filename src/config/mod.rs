//! # Configuration Management Module
//!
//! Centralised, TOML-backed configuration for the forum client.
//!
//! ## Configuration Structure
//!
//! - [`ApiConfig`] - REST backend location and request timeout
//! - [`SessionConfig`] - Where the signed-in user is remembered between runs
//! - [`TopicConfig`] - Topic view behaviour (polling interval)
//! - [`ValidationConfig`] - Form limits and the unique-name debounce delay
//! - [`NotificationConfig`] - How long notices stay on screen
//! - [`LoggingConfig`] - Logging level and optional log file
//!
//! ## Usage
//!
//! ```rust,no_run
//! use bbforum::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("bbforum.toml").await?;
//!     println!("Backend: {}", config.api.base_url);
//!
//!     Config::create_default("bbforum.toml").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration File Format
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:8080/"
//! timeout_seconds = 10
//!
//! [session]
//! path = "./data/session.json"
//!
//! [topic]
//! refresh_interval_seconds = 10
//!
//! [validation]
//! username_min = 3
//! username_max = 50
//! message_min = 5
//! message_max = 3000
//! unique_name_debounce_ms = 300
//!
//! [notifications]
//! duration_seconds = 3
//!
//! [logging]
//! level = "info"
//! file = "bbforum.log"
//! ```
//!
//! Every section except `[api]` may be omitted and falls back to its defaults.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub topic: TopicConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Backend root; endpoint paths (`api/topic`, `login`, ...) are joined onto it.
    pub base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

fn default_timeout_seconds() -> u64 {
    10
}

impl ApiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            path: "./data/session.json".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicConfig {
    /// Seconds between background refreshes while a topic is being watched.
    pub refresh_interval_seconds: u64,
}

impl Default for TopicConfig {
    fn default() -> Self {
        Self {
            refresh_interval_seconds: 10,
        }
    }
}

impl TopicConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    pub username_min: usize,
    pub username_max: usize,
    pub message_min: usize,
    pub message_max: usize,
    /// Quiet period before the unique-name lookup is sent (ms).
    pub unique_name_debounce_ms: u64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            username_min: 3,
            username_max: 50,
            message_min: 5,
            message_max: 3000,
            unique_name_debounce_ms: 300,
        }
    }
}

impl ValidationConfig {
    pub fn unique_name_debounce(&self) -> Duration {
        Duration::from_millis(self.unique_name_debounce_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub duration_seconds: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { duration_seconds: 3 }
    }
}

impl NotificationConfig {
    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Parse `level`; unknown values fall back to `Info`.
    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    /// Reject values the client cannot work with.
    pub fn validate(&self) -> Result<()> {
        let base = reqwest::Url::parse(&self.api.base_url)
            .map_err(|e| anyhow!("Invalid api.base_url '{}': {}", self.api.base_url, e))?;
        if base.cannot_be_a_base() {
            return Err(anyhow!("api.base_url '{}' cannot be used as a base", self.api.base_url));
        }
        if self.api.timeout_seconds == 0 {
            return Err(anyhow!("api.timeout_seconds must be greater than zero"));
        }
        if self.topic.refresh_interval_seconds == 0 {
            return Err(anyhow!("topic.refresh_interval_seconds must be greater than zero"));
        }
        let v = &self.validation;
        if v.username_min > v.username_max {
            return Err(anyhow!(
                "validation.username_min ({}) exceeds username_max ({})",
                v.username_min,
                v.username_max
            ));
        }
        if v.message_min > v.message_max {
            return Err(anyhow!(
                "validation.message_min ({}) exceeds message_max ({})",
                v.message_min,
                v.message_max
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api: ApiConfig {
                base_url: "http://localhost:8080/".to_string(),
                timeout_seconds: default_timeout_seconds(),
            },
            session: SessionConfig::default(),
            topic: TopicConfig::default(),
            validation: ValidationConfig::default(),
            notifications: NotificationConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("bbforum.log".to_string()),
            },
        }
    }
}
