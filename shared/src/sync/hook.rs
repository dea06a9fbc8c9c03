use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::sync::bus::SpaceBus;
use crate::sync::clock::{Clock, SystemClock};
use crate::sync::store::SpaceStore;
use crate::types::relay_config::{AppEntry, SyncConfig};
use crate::types::space::{
    DEFAULT_DEBOUNCE_MS, SYNC_CHANNEL_NAME, SpaceId, SpaceSyncMessage, UNIFIED_STORAGE_KEY,
};
use crate::types::sync_error::SyncResult;

/// Invoked with the new space whenever another app's change is applied.
pub type SpaceCallback = Arc<dyn Fn(&SpaceId) + Send + Sync>;

// ---------------------------------------------------------------------------
// Options & outcomes
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
pub struct SyncOptions {
    pub app_id: String,
    /// Per-app slot from before the unified key, migrated on initialize.
    pub legacy_key: Option<String>,
    pub storage_key: String,
    pub channel_name: String,
    pub debounce_ms: i64,
}

impl SyncOptions {
    pub fn new(app_id: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            legacy_key: None,
            storage_key: UNIFIED_STORAGE_KEY.to_string(),
            channel_name: SYNC_CHANNEL_NAME.to_string(),
            debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }

    pub fn from_config(sync: &SyncConfig, app: &AppEntry) -> Self {
        Self {
            app_id: app.app_id.clone(),
            legacy_key: app.legacy_key.clone(),
            storage_key: sync.storage_key.clone(),
            channel_name: sync.channel_name.clone(),
            debounce_ms: sync.debounce_ms,
        }
    }

    pub fn with_legacy_key(mut self, key: impl Into<String>) -> Self {
        self.legacy_key = Some(key.into());
        self
    }

    pub fn with_debounce_ms(mut self, debounce_ms: i64) -> Self {
        self.debounce_ms = debounce_ms;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MigrationOutcome {
    /// Legacy value copied into the empty unified slot
    Migrated,
    /// Unified slot already held a value; left untouched
    AlreadyPresent,
    /// Legacy slot empty or unparseable
    NoLegacyValue,
    /// This app has no legacy key
    NotConfigured,
    /// No store to migrate in
    Unavailable,
}

/// What happened to one received message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Applied,
    SelfEcho,
    Stale,
    Debounced,
    Unchanged,
}

// ---------------------------------------------------------------------------
// Filter state
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct SyncState {
    current: Option<SpaceId>,
    last_broadcast: Option<i64>,
    last_received: Option<i64>,
}

impl SyncState {
    /// Decide whether `message` should be applied, updating the local view
    /// when it is. Filters run in a fixed order: self-echo, anti-loop,
    /// debounce, then comparison with the local value.
    fn evaluate(&mut self, message: &SpaceSyncMessage, app_id: &str, debounce_ms: i64) -> Verdict {
        if message.source_app == app_id {
            return Verdict::SelfEcho;
        }
        if matches!(self.last_broadcast, Some(sent) if message.timestamp <= sent) {
            return Verdict::Stale;
        }
        let window = debounce_ms.max(0).unsigned_abs();
        if matches!(self.last_received, Some(prev) if message.timestamp.abs_diff(prev) < window) {
            return Verdict::Debounced;
        }
        self.last_received = Some(message.timestamp);

        if self.current.as_ref() == Some(&message.space_id) {
            return Verdict::Unchanged;
        }
        self.current = Some(message.space_id.clone());
        Verdict::Applied
    }
}

// ---------------------------------------------------------------------------
// SpaceSync
// ---------------------------------------------------------------------------

/// Keeps one app's current space in step with every other app on the device.
///
/// A missing store or bus stands for an environment without shared storage or
/// broadcast support. Operations needing the missing piece quietly do nothing
/// and the app keeps working with its own local state.
pub struct SpaceSync {
    shared: Arc<SyncShared>,
    listener: Option<JoinHandle<()>>,
}

struct SyncShared {
    options: SyncOptions,
    store: Option<SpaceStore>,
    bus: Option<Arc<SpaceBus>>,
    clock: Arc<dyn Clock>,
    state: Mutex<SyncState>,
    callback: Mutex<Option<SpaceCallback>>,
}

impl std::fmt::Debug for SpaceSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpaceSync")
            .field("app_id", &self.shared.options.app_id)
            .field("has_store", &self.shared.store.is_some())
            .field("has_bus", &self.shared.bus.is_some())
            .field("listening", &self.is_listening())
            .finish()
    }
}

impl SpaceSync {
    pub fn new(options: SyncOptions, store: Option<SpaceStore>, bus: Option<Arc<SpaceBus>>) -> Self {
        Self::with_clock(options, store, bus, Arc::new(SystemClock))
    }

    pub fn with_clock(
        options: SyncOptions,
        store: Option<SpaceStore>,
        bus: Option<Arc<SpaceBus>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            shared: Arc::new(SyncShared {
                options,
                store,
                bus,
                clock,
                state: Mutex::new(SyncState::default()),
                callback: Mutex::new(None),
            }),
            listener: None,
        }
    }

    pub fn app_id(&self) -> &str {
        &self.shared.options.app_id
    }

    pub fn is_listening(&self) -> bool {
        self.listener.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub async fn current_space(&self) -> Option<SpaceId> {
        self.shared.state.lock().await.current.clone()
    }

    /// Copy the legacy per-app value into the unified slot if the unified slot
    /// is still empty, then load the unified value as the local space.
    ///
    /// The legacy key is never deleted; apps that have not moved to the
    /// unified key may still read it.
    pub async fn initialize(&self) -> SyncResult<MigrationOutcome> {
        let options = &self.shared.options;
        let Some(store) = &self.shared.store else {
            debug!("{}: no store, skipping initialize", options.app_id);
            return Ok(MigrationOutcome::Unavailable);
        };

        let outcome = match &options.legacy_key {
            None => MigrationOutcome::NotConfigured,
            Some(legacy_key) => {
                if store.get(&options.storage_key).await.is_some() {
                    MigrationOutcome::AlreadyPresent
                } else {
                    match store.get(legacy_key).await {
                        Some(value) if value.parse::<SpaceId>().is_ok() => {
                            store.set(&options.storage_key, &value).await?;
                            info!(
                                "{}: migrated {} = {} into {}",
                                options.app_id, legacy_key, value, options.storage_key
                            );
                            MigrationOutcome::Migrated
                        }
                        Some(value) => {
                            warn!(
                                "{}: ignoring unusable legacy value {:?} in {}",
                                options.app_id, value, legacy_key
                            );
                            MigrationOutcome::NoLegacyValue
                        }
                        None => MigrationOutcome::NoLegacyValue,
                    }
                }
            }
        };

        if let Some(raw) = store.get(&options.storage_key).await {
            match raw.parse::<SpaceId>() {
                Ok(space) => self.shared.state.lock().await.current = Some(space),
                Err(e) => warn!("{}: unified slot unreadable: {}", options.app_id, e),
            }
        }

        Ok(outcome)
    }

    /// Start applying changes from other apps. Replaces any previous listener
    /// and callback. Returns `false` when there is no bus to listen on.
    pub async fn subscribe<F>(&mut self, on_change: F) -> bool
    where
        F: Fn(&SpaceId) + Send + Sync + 'static,
    {
        *self.shared.callback.lock().await = Some(Arc::new(on_change));

        let Some(bus) = &self.shared.bus else {
            debug!("{}: no bus, cross-app sync disabled", self.app_id());
            return false;
        };

        if let Some(old) = self.listener.take() {
            old.abort();
        }

        let mut handle = bus.open(&self.shared.options.channel_name).await;
        let shared = Arc::clone(&self.shared);
        self.listener = Some(tokio::spawn(async move {
            while let Ok(message) = handle.recv().await {
                shared.handle(message).await;
            }
            debug!("{}: sync channel closed", shared.options.app_id);
        }));

        info!(
            "{}: listening on {}",
            self.app_id(),
            self.shared.options.channel_name
        );
        true
    }

    /// Run one received message through the filters and apply it if it passes.
    pub async fn handle_message(&self, message: SpaceSyncMessage) -> Verdict {
        self.shared.handle(message).await
    }

    /// Record a local space switch and tell every other app about it.
    ///
    /// The unified slot is written before the message is posted. Returns the
    /// number of receivers reached.
    pub async fn broadcast(&self, space: SpaceId) -> SyncResult<usize> {
        let options = &self.shared.options;
        let timestamp = self.shared.clock.now_millis();

        if let Some(store) = &self.shared.store {
            store.set(&options.storage_key, space.as_str()).await?;
        }

        {
            let mut state = self.shared.state.lock().await;
            state.current = Some(space.clone());
            state.last_broadcast = Some(timestamp);
        }

        let Some(bus) = &self.shared.bus else {
            return Ok(0);
        };

        let message = SpaceSyncMessage::space_changed(space, options.app_id.clone(), timestamp);
        bus.post(&options.channel_name, message).await
    }

    /// Stop listening and release the subscription.
    pub async fn teardown(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
            let _ = listener.await;
            info!("{}: stopped listening", self.app_id());
        }
        if let Some(bus) = &self.shared.bus {
            bus.cleanup().await;
        }
    }
}

impl Drop for SpaceSync {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

impl SyncShared {
    async fn handle(&self, message: SpaceSyncMessage) -> Verdict {
        let verdict = self.state.lock().await.evaluate(
            &message,
            &self.options.app_id,
            self.options.debounce_ms,
        );

        if verdict != Verdict::Applied {
            debug!("{}: {:?} for {}", self.options.app_id, verdict, message);
            return verdict;
        }

        if let Some(store) = &self.store {
            if let Err(e) = store
                .set(&self.options.storage_key, message.space_id.as_str())
                .await
            {
                warn!("{}: failed to write unified slot: {}", self.options.app_id, e);
            }
        }

        let callback = self.callback.lock().await.clone();
        if let Some(callback) = callback {
            callback(&message.space_id);
        }

        info!("{}: applied {}", self.options.app_id, message);
        verdict
    }
}
