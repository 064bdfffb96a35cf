//! Configuration system for the hub.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $HUB_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/hub/config.toml
//!   3. ~/.config/hub/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    pub hub: HubSettings,
    pub stats: StatsSettings,
    pub status: StatusSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HubSettings {
    /// Hub name, shown in logs.
    pub name: String,
    /// Expected concurrent users. The session list is pre-sized to this.
    pub max_users: usize,
    /// First SID handed out after start.
    pub first_sid: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsSettings {
    /// Seconds between traffic samples.
    pub interval_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusSettings {
    pub enabled: bool,
    /// Loopback port for the JSON status endpoint.
    pub port: u16,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

/// Default sampling interval in seconds.
pub const TIMEOUT_STATS: u64 = 60;

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            name: "hub".to_string(),
            max_users: 500,
            first_sid: 1,
        }
    }
}

impl Default for StatsSettings {
    fn default() -> Self {
        Self {
            interval_secs: TIMEOUT_STATS,
        }
    }
}

impl Default for StatusSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            port: 7710,
        }
    }
}

impl StatsSettings {
    /// Sampling interval, never shorter than one second.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("hub")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {0}: {1}")]
    ReadFailed(PathBuf, std::io::Error),
    #[error("failed to parse {0}: {1}")]
    ParseFailed(PathBuf, toml::de::Error),
    #[error("failed to write {0}: {1}")]
    WriteFailed(PathBuf, std::io::Error),
    #[error("failed to serialize: {0}")]
    SerializeFailed(toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl HubConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            let text = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadFailed(path.clone(), e))?;
            toml::from_str(&text).map_err(|e| ConfigError::ParseFailed(path.clone(), e))?
        } else {
            HubConfig::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Config file path.
    pub fn file_path() -> PathBuf {
        std::env::var("HUB_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Write default config if none exists. Returns the path.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if !path.exists() {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
            }
            let text = toml::to_string_pretty(&HubConfig::default())
                .map_err(ConfigError::SerializeFailed)?;
            std::fs::write(&path, text).map_err(|e| ConfigError::WriteFailed(path.clone(), e))?;
        }
        Ok(path)
    }

    /// Apply HUB_* overrides from `lookup` (the process environment in `load`).
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("HUB_HUB__NAME") {
            self.hub.name = v;
        }
        if let Some(n) = lookup("HUB_HUB__MAX_USERS").and_then(|v| v.parse().ok()) {
            self.hub.max_users = n;
        }
        if let Some(n) = lookup("HUB_STATS__INTERVAL_SECS").and_then(|v| v.parse().ok()) {
            self.stats.interval_secs = n;
        }
        if let Some(v) = lookup("HUB_STATUS__ENABLED") {
            self.status.enabled = v == "true" || v == "1";
        }
        if let Some(p) = lookup("HUB_STATUS__PORT").and_then(|v| v.parse().ok()) {
            self.status.port = p;
        }
    }
}
