use serde::Deserialize;
use thiserror::Error;

use crate::types::space::{
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_DEBOUNCE_MS, SYNC_CHANNEL_NAME, UNIFIED_STORAGE_KEY,
};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// Config structs
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, Clone)]
pub struct RelayConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Seconds between sweeps that drop topics nobody listens to.
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_secs: u64,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    /// JSON file backing the unified store. In-memory only when unset.
    pub path: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SyncConfig {
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    #[serde(default = "default_channel_name")]
    pub channel_name: String,
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: i64,
}

/// One suite app known to the relay. `legacy_key` names the per-app slot
/// used before the unified key existed.
#[derive(Debug, Deserialize, Clone)]
pub struct AppEntry {
    pub app_id: String,
    pub legacy_key: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub relay: RelayConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub sync: SyncConfig,
    #[serde(default)]
    pub apps: Vec<AppEntry>,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

impl RelayConfig {
    /// Full bind address, e.g. `"127.0.0.1:4317"`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

impl StorageConfig {
    /// Storage path with a leading `~/` expanded against `$HOME`.
    pub fn resolved_path(&self) -> Option<std::path::PathBuf> {
        let raw = self.path.as_deref().filter(|p| !p.trim().is_empty())?;
        if let Some(rest) = raw.strip_prefix("~/") {
            if let Some(home) = std::env::var_os("HOME") {
                return Some(std::path::PathBuf::from(home).join(rest));
            }
        }
        Some(std::path::PathBuf::from(raw))
    }
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            channel_capacity: default_channel_capacity(),
            cleanup_interval_secs: default_cleanup_interval(),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            storage_key: default_storage_key(),
            channel_name: default_channel_name(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde defaults
// ---------------------------------------------------------------------------

pub fn default_bind() -> String {
    "127.0.0.1".to_string()
}

pub fn default_port() -> u16 {
    4317
}

pub fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

pub fn default_cleanup_interval() -> u64 {
    60
}

pub fn default_storage_key() -> String {
    UNIFIED_STORAGE_KEY.to_string()
}

pub fn default_channel_name() -> String {
    SYNC_CHANNEL_NAME.to_string()
}

pub fn default_debounce_ms() -> i64 {
    DEFAULT_DEBOUNCE_MS
}
