//! Application configuration.

use crate::error::{AppError, AppResult};
use consensus_channel::ChannelConfig;
use consensus_sync::PollPlan;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Backend REST root.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    /// Push channel (debate stream) URL.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Instrument selected at startup.
    #[serde(default = "default_symbol")]
    pub default_symbol: String,
    /// Agent whose closing message constitutes the committee decision.
    #[serde(default = "default_arbiter_agent")]
    pub arbiter_agent: String,
    /// Bound on the debate log; oldest messages drop off past this.
    #[serde(default = "default_debate_log_cap")]
    pub debate_log_cap: usize,
    /// Push channel settings.
    #[serde(default)]
    pub channel: ChannelSettings,
    /// Poll cadence settings.
    #[serde(default)]
    pub polling: PollingSettings,
    /// Notification settings.
    #[serde(default)]
    pub notifications: NotificationSettings,
}

fn default_backend_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_ws_url() -> String {
    "ws://127.0.0.1:8000/ws/debate".to_string()
}

fn default_symbol() -> String {
    "cmt_btcusdt".to_string()
}

fn default_arbiter_agent() -> String {
    "Risk Manager".to_string()
}

fn default_debate_log_cap() -> usize {
    1000
}

/// Push channel configuration subset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSettings {
    /// Maximum reconnection attempts (0 = infinite).
    pub max_reconnect_attempts: u32,
    /// Base delay for reconnection backoff (ms).
    pub reconnect_base_delay_ms: u64,
    /// Maximum delay for reconnection backoff (ms).
    pub reconnect_max_delay_ms: u64,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            max_reconnect_attempts: 0,
            reconnect_base_delay_ms: 1000,
            reconnect_max_delay_ms: 60000,
        }
    }
}

impl From<ChannelSettings> for ChannelConfig {
    fn from(cfg: ChannelSettings) -> Self {
        Self {
            url: String::new(), // Set separately
            max_reconnect_attempts: cfg.max_reconnect_attempts,
            reconnect_base_delay_ms: cfg.reconnect_base_delay_ms,
            reconnect_max_delay_ms: cfg.reconnect_max_delay_ms,
        }
    }
}

/// Poll cadence configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollingSettings {
    /// Portfolio stats cadence (ms).
    #[serde(default = "default_portfolio_interval_ms")]
    pub portfolio_interval_ms: u64,
    /// Trade log cadence (ms).
    #[serde(default = "default_trades_interval_ms")]
    pub trades_interval_ms: u64,
    /// Candle series cadence (ms).
    #[serde(default = "default_candles_interval_ms")]
    pub candles_interval_ms: u64,
    /// Trade log page size.
    #[serde(default = "default_trades_limit")]
    pub trades_limit: usize,
}

fn default_portfolio_interval_ms() -> u64 {
    10_000
}

fn default_trades_interval_ms() -> u64 {
    30_000
}

fn default_candles_interval_ms() -> u64 {
    10_000
}

fn default_trades_limit() -> usize {
    50
}

impl Default for PollingSettings {
    fn default() -> Self {
        Self {
            portfolio_interval_ms: default_portfolio_interval_ms(),
            trades_interval_ms: default_trades_interval_ms(),
            candles_interval_ms: default_candles_interval_ms(),
            trades_limit: default_trades_limit(),
        }
    }
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// Display window before a notification self-dismisses (ms).
    #[serde(default = "default_display_window_ms")]
    pub display_window_ms: u64,
    /// Ask for notification permission at startup instead of waiting for
    /// an explicit operator action.
    #[serde(default)]
    pub request_permission_on_start: bool,
}

fn default_display_window_ms() -> u64 {
    5_000
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            display_window_ms: default_display_window_ms(),
            request_permission_on_start: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`, falling back to defaults when the
    /// file does not exist.
    pub fn load(path: &str) -> AppResult<Self> {
        if Path::new(path).exists() {
            Self::from_file(path)
        } else {
            tracing::warn!(path = %path, "Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    /// Channel config with the URL filled in.
    pub fn channel_config(&self) -> ChannelConfig {
        let mut config: ChannelConfig = self.channel.clone().into();
        config.url = self.ws_url.clone();
        config
    }

    /// Poll cadence plan.
    pub fn poll_plan(&self) -> PollPlan {
        PollPlan {
            portfolio_interval: Duration::from_millis(self.polling.portfolio_interval_ms),
            trades_interval: Duration::from_millis(self.polling.trades_interval_ms),
            candles_interval: Duration::from_millis(self.polling.candles_interval_ms),
            trades_limit: self.polling.trades_limit,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            ws_url: default_ws_url(),
            default_symbol: default_symbol(),
            arbiter_agent: default_arbiter_agent(),
            debate_log_cap: default_debate_log_cap(),
            channel: ChannelSettings::default(),
            polling: PollingSettings::default(),
            notifications: NotificationSettings::default(),
        }
    }
}
