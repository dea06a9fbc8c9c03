use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Invalid space id: {0:?}")]
    InvalidSpaceId(String),

    #[error("Failed to broadcast space change: {0}")]
    ChannelSendFailed(String),

    #[error("Sync channel closed")]
    ChannelClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type SyncResult<T> = Result<T, SyncError>;
