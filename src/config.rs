//! Runtime configuration read from environment variables.
//!
//! `main` calls `dotenvy::dotenv()` first, so a `.env` file in the working
//! directory works as well.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::anyhow;

use crate::engine::{
    ANALYTICS_DAY_OFFSET, DEFAULT_POLL_INTERVAL, DEFAULT_QUOTA_COOLDOWN, DEFAULT_REPORT_INTERVAL,
    EngineConfig,
};

/// Default port if not specified via environment variable.
pub const DEFAULT_PORT: u16 = 3000;

/// Default database path if not specified via environment variable.
pub const DEFAULT_DB_PATH: &str = "sqlite:channel_pulse.db?mode=rwc";

#[derive(Debug, Clone)]
pub struct Config {
    /// Channel whose statistics are polled.
    pub channel_id: String,
    /// Bot API token.
    pub bot_token: String,
    /// OAuth token file for the YouTube APIs.
    pub token_file: PathBuf,
    pub port: u16,
    pub database_url: String,
    /// Public URL registered with `setWebhook` at startup, if any.
    pub webhook_url: Option<String>,
    pub webhook_secret: Option<String>,
    pub poll_interval: Duration,
    pub report_interval: Duration,
    pub quota_cooldown: Duration,
    /// Directory for the rotated log file.
    pub log_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Blank values count as unset. Unparsable numbers fall back to defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require =
            |key: &str| get(key).ok_or_else(|| anyhow!("missing required environment variable {key}"));
        let secs = |key: &str, default: Duration| {
            get(key)
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs)
                .unwrap_or(default)
        };

        Ok(Self {
            channel_id: require("CHANNEL_ID")?,
            bot_token: require("BOT_TOKEN")?,
            token_file: PathBuf::from(require("TOKEN_FILE")?),
            port: get("PULSE_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            database_url: get("PULSE_DATABASE_URL").unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
            webhook_url: get("WEBHOOK_URL"),
            webhook_secret: get("WEBHOOK_SECRET"),
            poll_interval: secs("POLL_INTERVAL_SECS", DEFAULT_POLL_INTERVAL),
            report_interval: secs("REPORT_INTERVAL_SECS", DEFAULT_REPORT_INTERVAL),
            quota_cooldown: secs("QUOTA_COOLDOWN_SECS", DEFAULT_QUOTA_COOLDOWN),
            log_dir: get("LOG_DIR").map(PathBuf::from),
        })
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            channel_id: self.channel_id.clone(),
            poll_interval: self.poll_interval,
            report_interval: self.report_interval,
            quota_cooldown: self.quota_cooldown,
            analytics_day_offset: ANALYTICS_DAY_OFFSET,
        }
    }
}
