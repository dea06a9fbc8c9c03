use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::sync_error::SyncError;

// ---------------------------------------------------------------------------
// Well-known names
// ---------------------------------------------------------------------------

/// Storage slot holding the current space for every app on this device.
pub const UNIFIED_STORAGE_KEY: &str = "ainex-current-space";

/// Topic every app subscribes to for space changes.
pub const SYNC_CHANNEL_NAME: &str = "ainex-space-sync";

/// Messages received closer together than this are treated as duplicates.
pub const DEFAULT_DEBOUNCE_MS: i64 = 100;

/// Per-topic buffer. Lagging receivers skip the oldest messages.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 100;

const PERSONAL: &str = "personal";
const ALL: &str = "all";

// ---------------------------------------------------------------------------
// SpaceId
// ---------------------------------------------------------------------------

/// Identifier of a workspace.
///
/// On the wire this is always a bare string: the sentinels are `"personal"`
/// and `"all"`, anything else is a space document id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SpaceId {
    /// The user's own, unshared space
    Personal,
    /// Aggregate view across every space the user belongs to
    All,
    /// A concrete shared space document
    Space(String),
}

impl SpaceId {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Personal => PERSONAL,
            Self::All => ALL,
            Self::Space(id) => id,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        !matches!(self, Self::Space(_))
    }
}

impl FromStr for SpaceId {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err(SyncError::InvalidSpaceId(s.to_string())),
            PERSONAL => Ok(Self::Personal),
            ALL => Ok(Self::All),
            id => Ok(Self::Space(id.to_string())),
        }
    }
}

impl TryFrom<String> for SpaceId {
    type Error = SyncError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SpaceId> for String {
    fn from(value: SpaceId) -> Self {
        match value {
            SpaceId::Space(id) => id,
            sentinel => sentinel.as_str().to_string(),
        }
    }
}

impl fmt::Display for SpaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Wire message
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncMessageKind {
    #[serde(rename = "SPACE_CHANGED")]
    SpaceChanged,
}

/// Payload posted on the sync topic whenever an app switches space.
///
/// `timestamp` is wall-clock milliseconds since the epoch. It orders and
/// de-duplicates messages but is not a logical clock.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpaceSyncMessage {
    #[serde(rename = "type")]
    pub kind: SyncMessageKind,
    pub space_id: SpaceId,
    pub source_app: String,
    pub timestamp: i64,
}

impl SpaceSyncMessage {
    pub fn space_changed(space_id: SpaceId, source_app: impl Into<String>, timestamp: i64) -> Self {
        Self {
            kind: SyncMessageKind::SpaceChanged,
            space_id,
            source_app: source_app.into(),
            timestamp,
        }
    }
}

impl fmt::Display for SpaceSyncMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "space={}, source={}, ts={}",
            self.space_id, self.source_app, self.timestamp
        )
    }
}
