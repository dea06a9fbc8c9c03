use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use shared::config::load_config;
use shared::sync::{MigrationOutcome, SpaceSync, SyncOptions};

use crate::AppState;

/// Run the legacy-key migration for every `[[apps]]` entry against the
/// relay's store. The first app with a usable legacy value wins; later apps
/// find the unified slot filled and leave it alone.
pub async fn migrate_legacy_keys(state: &AppState) -> Vec<(String, MigrationOutcome)> {
    let (sync, apps) = {
        let cfg = state.config.read().await;
        (cfg.sync.clone(), cfg.apps.clone())
    };

    let mut outcomes = Vec::with_capacity(apps.len());
    for app in &apps {
        let hook = SpaceSync::with_clock(
            SyncOptions::from_config(&sync, app),
            Some(state.store.clone()),
            None,
            Arc::clone(&state.clock),
        );
        match hook.initialize().await {
            Ok(outcome) => {
                info!("Migration for {}: {:?}", app.app_id, outcome);
                outcomes.push((app.app_id.clone(), outcome));
            }
            Err(e) => error!("Migration for {} failed: {}", app.app_id, e),
        }
    }
    outcomes
}

/// Periodically drop bus topics nobody listens to any more.
pub fn spawn_cleanup_task(state: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let secs = state.config.read().await.relay.cleanup_interval_secs;
            tokio::time::sleep(Duration::from_secs(secs)).await;
            state.bus.cleanup().await;
        }
    })
}

/// Re-read `path` and swap it in. Bind address, port and storage path are
/// only read at startup, so changes to them wait for a restart.
///
/// `sync.channel_name` keeps its running value: open event streams are
/// subscribed to the old topic and would stop seeing publishes.
pub async fn reload_config(state: &AppState, path: &str) -> Result<()> {
    let mut next = load_config(path).with_context(|| format!("Failed to reload {}", path))?;

    {
        let current = state.config.read().await;
        if current.relay.addr() != next.relay.addr() {
            warn!(
                "Bind address changed ({} → {}); restart to apply",
                current.relay.addr(),
                next.relay.addr()
            );
        }
        if current.storage.path != next.storage.path {
            warn!("storage.path changed; restart to apply");
        }
        if current.sync.channel_name != next.sync.channel_name {
            warn!(
                "sync.channel_name changed ({} → {}); keeping {} until restart",
                current.sync.channel_name, next.sync.channel_name, current.sync.channel_name
            );
            next.sync.channel_name = current.sync.channel_name.clone();
        }
    }

    state.config.reload(next).await;
    info!("Configuration reloaded from {}", path);
    Ok(())
}

/// Reload the config file whenever the process receives SIGHUP.
#[cfg(unix)]
pub fn spawn_sighup_reloader(state: AppState, path: String) -> Result<JoinHandle<()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut hangup = signal(SignalKind::hangup()).context("Failed to install SIGHUP handler")?;
    Ok(tokio::spawn(async move {
        while hangup.recv().await.is_some() {
            if let Err(e) = reload_config(&state, &path).await {
                error!("{:#}", e);
            }
        }
    }))
}
