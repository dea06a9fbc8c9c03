pub mod checklist;
pub mod json_error;
pub mod publish;
pub mod relay_config;
pub mod space;
pub mod sync_error;

pub use self::checklist::ChecklistItem;
pub use self::json_error::ErrorResponse;
pub use self::publish::{PublishRequest, PublishResponse};
pub use self::relay_config::{AppConfig, AppEntry, ConfigError};
pub use self::space::{
    DEFAULT_CHANNEL_CAPACITY, DEFAULT_DEBOUNCE_MS, SYNC_CHANNEL_NAME, SpaceId, SpaceSyncMessage,
    SyncMessageKind, UNIFIED_STORAGE_KEY,
};
pub use self::sync_error::{SyncError, SyncResult};
