use std::collections::HashMap;

use tokio::sync::{RwLock, broadcast};
use tracing::{debug, info};

use crate::types::space::{DEFAULT_CHANNEL_CAPACITY, SpaceSyncMessage};
use crate::types::sync_error::{SyncError, SyncResult};

/// Named publish/subscribe topics, one broadcast channel per name.
///
/// Delivery is best effort: posting to a topic nobody listens to succeeds
/// with zero receivers, and a receiver that falls behind by more than the
/// channel capacity skips the oldest messages.
#[derive(Debug)]
pub struct SpaceBus {
    /// topic name → broadcast sender
    pub(crate) channels: RwLock<HashMap<String, broadcast::Sender<SpaceSyncMessage>>>,
    capacity: usize,
}

/// An open subscription to one topic.
#[derive(Debug)]
pub struct ChannelHandle {
    name: String,
    tx: broadcast::Sender<SpaceSyncMessage>,
    rx: broadcast::Receiver<SpaceSyncMessage>,
}

impl SpaceBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
        }
    }

    /// Get or create a topic and subscribe to it.
    pub async fn open(&self, name: &str) -> ChannelHandle {
        let tx = self.sender(name).await;
        let rx = tx.subscribe();
        ChannelHandle {
            name: name.to_string(),
            tx,
            rx,
        }
    }

    async fn sender(&self, name: &str) -> broadcast::Sender<SpaceSyncMessage> {
        let mut channels = self.channels.write().await;
        channels
            .entry(name.to_string())
            .or_insert_with(|| {
                info!("Creating sync channel: {}", name);
                let (tx, _) = broadcast::channel(self.capacity);
                tx
            })
            .clone()
    }

    /// Publish on a topic. Returns how many receivers the message reached.
    pub async fn post(&self, name: &str, message: SpaceSyncMessage) -> SyncResult<usize> {
        let channels = self.channels.read().await;
        let Some(tx) = channels.get(name) else {
            debug!("No channel named {}, dropping {}", name, message);
            return Ok(0);
        };
        let count = tx.receiver_count();
        if count == 0 {
            debug!("Channel {} has no receivers, dropping {}", name, message);
            return Ok(0);
        }
        info!("Posting on {} ({} receivers): {}", name, count, message);
        tx.send(message)
            .map_err(|e| SyncError::ChannelSendFailed(e.to_string()))
    }

    /// Subscribe to a topic without holding a sender, creating it if needed.
    pub async fn subscribe(&self, name: &str) -> broadcast::Receiver<SpaceSyncMessage> {
        self.sender(name).await.subscribe()
    }

    pub async fn channel_count(&self) -> usize {
        self.channels.read().await.len()
    }

    /// Remove topics with no active subscribers
    pub async fn cleanup(&self) {
        let mut channels = self.channels.write().await;
        let before = channels.len();
        channels.retain(|_, tx| tx.receiver_count() > 0);
        let after = channels.len();
        if before != after {
            info!(
                "Sync cleanup: removed {} idle channels ({} → {} remaining)",
                before - after,
                before,
                after
            );
        }
    }
}

impl Default for SpaceBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Post through this handle. Every open handle on the topic receives the
    /// message, this one included.
    pub fn post(&self, message: SpaceSyncMessage) -> SyncResult<usize> {
        self.tx
            .send(message)
            .map_err(|e| SyncError::ChannelSendFailed(e.to_string()))
    }

    /// Next message, skipping past any that were dropped because this handle
    /// lagged. Fails only once every sender is gone.
    pub async fn recv(&mut self) -> SyncResult<SpaceSyncMessage> {
        loop {
            match self.rx.recv().await {
                Ok(message) => return Ok(message),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("Sync channel {} lagged by {} messages", self.name, n);
                }
                Err(broadcast::error::RecvError::Closed) => return Err(SyncError::ChannelClosed),
            }
        }
    }
}
