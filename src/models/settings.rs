//! Settings Models
//!
//! Monitor configuration data structures.

use case_review_pacing::{NarrativeScripts, PacingConfig};
use serde::{Deserialize, Serialize};

/// Monitor configuration stored in config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// WebSocket endpoint broadcasting case events
    pub ws_url: String,
    /// Base URL of the case API (history backfill)
    pub api_base_url: String,
    /// Fixed delay between reconnect attempts, in seconds
    pub reconnect_interval_secs: u64,
    /// Keep-alive ping interval, in seconds
    pub keepalive_interval_secs: u64,
    /// Missed keep-alive intervals before the connection is reported stale
    #[serde(default = "default_stale_after_missed")]
    pub stale_after_missed: u32,
    /// Maximum events retained per case
    pub event_log_capacity: usize,
    /// Fetch recorded activities when a case is selected
    #[serde(default = "default_history_backfill")]
    pub history_backfill: bool,
    /// Request timeout for the history endpoint, in seconds
    #[serde(default = "default_history_timeout_secs")]
    pub history_timeout_secs: u64,
    /// Display pacing timings
    #[serde(default)]
    pub pacing: PacingConfig,
    /// Scripted messages shown per stage
    #[serde(default)]
    pub narrative: NarrativeScripts,
}

fn default_stale_after_missed() -> u32 {
    2
}

fn default_history_backfill() -> bool {
    true
}

fn default_history_timeout_secs() -> u64 {
    10
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            ws_url: "ws://localhost:8000/ws/cases".to_string(),
            api_base_url: "http://localhost:8000".to_string(),
            reconnect_interval_secs: 3,
            keepalive_interval_secs: 30,
            stale_after_missed: 2,
            event_log_capacity: 100,
            history_backfill: true,
            history_timeout_secs: 10,
            pacing: PacingConfig::default(),
            narrative: NarrativeScripts::default(),
        }
    }
}

/// Settings update request (partial update)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigUpdate {
    pub ws_url: Option<String>,
    pub api_base_url: Option<String>,
    pub reconnect_interval_secs: Option<u64>,
    pub keepalive_interval_secs: Option<u64>,
    pub stale_after_missed: Option<u32>,
    pub event_log_capacity: Option<usize>,
    pub history_backfill: Option<bool>,
    pub history_timeout_secs: Option<u64>,
    pub pacing: Option<PacingConfig>,
}

impl MonitorConfig {
    /// Apply a partial update to the configuration
    pub fn apply_update(&mut self, update: ConfigUpdate) {
        if let Some(url) = update.ws_url {
            self.ws_url = url;
        }
        if let Some(url) = update.api_base_url {
            self.api_base_url = url;
        }
        if let Some(secs) = update.reconnect_interval_secs {
            self.reconnect_interval_secs = secs;
        }
        if let Some(secs) = update.keepalive_interval_secs {
            self.keepalive_interval_secs = secs;
        }
        if let Some(missed) = update.stale_after_missed {
            self.stale_after_missed = missed;
        }
        if let Some(capacity) = update.event_log_capacity {
            self.event_log_capacity = capacity;
        }
        if let Some(enabled) = update.history_backfill {
            self.history_backfill = enabled;
        }
        if let Some(secs) = update.history_timeout_secs {
            self.history_timeout_secs = secs;
        }
        if let Some(pacing) = update.pacing {
            self.pacing = pacing;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !(self.ws_url.starts_with("ws://") || self.ws_url.starts_with("wss://")) {
            return Err(format!(
                "Invalid ws_url: {}. Must start with ws:// or wss://",
                self.ws_url
            ));
        }

        if !(self.api_base_url.starts_with("http://") || self.api_base_url.starts_with("https://"))
        {
            return Err(format!(
                "Invalid api_base_url: {}. Must start with http:// or https://",
                self.api_base_url
            ));
        }

        if self.reconnect_interval_secs == 0 {
            return Err("reconnect_interval_secs must be at least 1 second".to_string());
        }

        if self.keepalive_interval_secs == 0 {
            return Err("keepalive_interval_secs must be at least 1 second".to_string());
        }

        if self.stale_after_missed == 0 {
            return Err("stale_after_missed must be at least 1".to_string());
        }

        if self.event_log_capacity == 0 || self.event_log_capacity > 10_000 {
            return Err("event_log_capacity must be between 1 and 10000".to_string());
        }

        self.pacing.validate().map_err(|e| e.to_string())?;

        Ok(())
    }
}
