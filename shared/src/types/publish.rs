use serde::{Deserialize, Serialize};

use crate::types::space::SpaceId;

/// Body of a relay publish request. The relay stamps `timestamp` when the
/// caller leaves it out.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishRequest {
    pub space_id: SpaceId,
    pub source_app: String,
    #[serde(default)]
    pub timestamp: Option<i64>,
}

/// Relay reply to a publish request.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResponse {
    pub space_id: SpaceId,
    pub timestamp: i64,
    /// Receivers the message reached; zero is not an error.
    pub delivered: usize,
}
