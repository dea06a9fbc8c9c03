use std::collections::HashSet;
use std::fs;
use tracing::{debug, error, info};

use crate::types::relay_config::{AppConfig, ConfigError};

pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    info!("Loading configuration from: {}", path);

    let contents = fs::read_to_string(path)?;
    debug!("Processing file: {}", path);

    if contents.trim().is_empty() {
        error!("Configuration file is empty");
        return Err(ConfigError::InvalidConfig("empty file".into()));
    }

    let config = parse_config(&contents)?;

    info!("Configuration loaded successfully");
    debug!("Config: {:?}", config);

    Ok(config)
}

/// Parse and validate configuration text without touching the filesystem.
pub fn parse_config(contents: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = toml::from_str(contents)?;

    validate_config(&config)?;

    info!("Config validated");

    Ok(config)
}

fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.relay.bind.trim().is_empty() {
        return Err(ConfigError::InvalidConfig("relay.bind cannot be empty".into()));
    }

    if config.relay.channel_capacity == 0 {
        return Err(ConfigError::InvalidConfig(
            "relay.channel_capacity must be greater than 0".into(),
        ));
    }

    if config.relay.cleanup_interval_secs == 0 {
        return Err(ConfigError::InvalidConfig(
            "relay.cleanup_interval_secs must be greater than 0".into(),
        ));
    }

    if config.sync.storage_key.trim().is_empty() {
        return Err(ConfigError::InvalidConfig(
            "sync.storage_key cannot be empty".into(),
        ));
    }

    if config.sync.channel_name.trim().is_empty() {
        return Err(ConfigError::InvalidConfig(
            "sync.channel_name cannot be empty".into(),
        ));
    }

    if config.sync.debounce_ms < 0 {
        return Err(ConfigError::InvalidConfig(
            "sync.debounce_ms cannot be negative".into(),
        ));
    }

    let mut seen = HashSet::new();
    for app in &config.apps {
        if app.app_id.trim().is_empty() {
            return Err(ConfigError::InvalidConfig("apps.app_id cannot be empty".into()));
        }
        if !seen.insert(app.app_id.as_str()) {
            return Err(ConfigError::InvalidConfig(format!(
                "duplicate app_id: {}",
                app.app_id
            )));
        }
        // Migrating the unified key into itself would be a silent no-op.
        if app.legacy_key.as_deref() == Some(config.sync.storage_key.as_str()) {
            return Err(ConfigError::InvalidConfig(format!(
                "legacy_key of {} equals sync.storage_key",
                app.app_id
            )));
        }
    }

    Ok(())
}
