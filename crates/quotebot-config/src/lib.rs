use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use quotebot_types::ContentType;

/// Bounds for the recurring interval, in minutes.
pub const MIN_INTERVAL_MINUTES: u64 = 1;
pub const MAX_INTERVAL_MINUTES: u64 = 1440;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON5 parse error: {0}")]
    Json5(#[from] json5::Error),
    #[error("Config directory not found")]
    NoDirFound,
    #[error("interval_minutes must be between {MIN_INTERVAL_MINUTES} and {MAX_INTERVAL_MINUTES}, got {0}")]
    IntervalOutOfRange(u64),
}

/// A schedule entry declared in the config file, loaded into the registry
/// at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleSpec {
    /// 24-hour wall-clock time, "HH:MM".
    pub time: String,
    /// Content kind to produce.
    #[serde(default = "default_content_type")]
    pub content_type: ContentType,
}

fn default_content_type() -> ContentType {
    ContentType::Text
}

/// Top-level quotebot configuration.
///
/// Credentials are held in memory only once loaded; nothing is written back
/// at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteBotConfig {
    /// Telegram bot token.
    #[serde(default)]
    pub bot_token: String,
    /// Destination chat ID.
    #[serde(default)]
    pub chat_id: String,
    /// Gemini API key.
    #[serde(default)]
    pub gemini_api_key: String,
    /// Recurring interval in minutes (1–1440).
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
    /// Time-of-day schedule entries registered at startup.
    #[serde(default)]
    pub schedules: Vec<ScheduleSpec>,
}

fn default_interval_minutes() -> u64 {
    10
}

impl Default for QuoteBotConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            chat_id: String::new(),
            gemini_api_key: String::new(),
            interval_minutes: default_interval_minutes(),
            schedules: Vec::new(),
        }
    }
}

impl QuoteBotConfig {
    /// Validate value ranges. Formats are checked where the values are used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_INTERVAL_MINUTES..=MAX_INTERVAL_MINUTES).contains(&self.interval_minutes) {
            return Err(ConfigError::IntervalOutOfRange(self.interval_minutes));
        }
        Ok(())
    }
}

/// Resolve the quotebot config directory (~/.quotebot/).
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    dirs::home_dir()
        .map(|h| h.join(".quotebot"))
        .ok_or(ConfigError::NoDirFound)
}

/// Resolve the config file path (~/.quotebot/config.json5).
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.json5"))
}

/// Load configuration from the default path, apply environment overrides,
/// and validate.
pub fn load_config() -> Result<QuoteBotConfig, ConfigError> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let path = config_file_path()?;
    let mut config = load_config_from(&path)?;
    apply_env_overrides(&mut config);
    config.validate()?;
    Ok(config)
}

/// Load configuration from a specific path, falling back to defaults if not
/// found.
pub fn load_config_from(path: &Path) -> Result<QuoteBotConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!("Config file not found at {}, using defaults", path.display());
        return Ok(QuoteBotConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: QuoteBotConfig = json5::from_str(&content)?;
    Ok(config)
}

/// Override config values from `QUOTEBOT_*` environment variables.
pub fn apply_env_overrides(config: &mut QuoteBotConfig) {
    if let Ok(v) = std::env::var("QUOTEBOT_BOT_TOKEN") {
        config.bot_token = v;
    }
    if let Ok(v) = std::env::var("QUOTEBOT_CHAT_ID") {
        config.chat_id = v;
    }
    if let Ok(v) = std::env::var("QUOTEBOT_GEMINI_API_KEY") {
        config.gemini_api_key = v;
    }
    if let Ok(v) = std::env::var("QUOTEBOT_INTERVAL_MINUTES") {
        match v.parse::<u64>() {
            Ok(minutes) => config.interval_minutes = minutes,
            Err(_) => tracing::warn!("Ignoring non-numeric QUOTEBOT_INTERVAL_MINUTES={v}"),
        }
    }
}
