use std::convert::Infallible;

use anyhow::{Context, Result};
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Request, Response, StatusCode};
use serde_json::json;
use tracing::{info, warn};

use shared::types::{PublishRequest, PublishResponse, SpaceId, SpaceSyncMessage};

use crate::AppState;
use crate::handlers::http::utils::{json_response, read_json_body};

/// GET /api/space
///
/// Current value of the unified slot, `null` when no app has chosen a space.
pub async fn handle_get_space(
    _req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let key = state.config.read().await.sync.storage_key.clone();

    let space = match state.store.get(&key).await {
        Some(raw) => match raw.parse::<SpaceId>() {
            Ok(space) => Some(space),
            Err(e) => {
                warn!("Unified slot {} holds an unusable value: {}", key, e);
                None
            }
        },
        None => None,
    };

    json_response::deliver_success_json(Some(json!({ "spaceId": space })))
}

/// POST /api/space
///
/// Body: `{"spaceId": "...", "sourceApp": "...", "timestamp"?: ms}`.
/// Writes the unified slot, then posts the change to every subscriber.
pub async fn handle_publish_space(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let body: PublishRequest = match read_json_body(req).await {
        Ok(body) => body,
        Err(rejection) => {
            return json_response::deliver_error_json(
                rejection.code,
                &rejection.message,
                rejection.status,
            );
        }
    };

    let source_app = body.source_app.trim().to_string();
    if source_app.is_empty() {
        return json_response::deliver_error_json(
            "MISSING_FIELD",
            "Missing required field: sourceApp",
            StatusCode::BAD_REQUEST,
        );
    }

    let (storage_key, channel_name) = {
        let cfg = state.config.read().await;
        (cfg.sync.storage_key.clone(), cfg.sync.channel_name.clone())
    };

    let timestamp = body.timestamp.unwrap_or_else(|| state.clock.now_millis());

    state
        .store
        .set(&storage_key, body.space_id.as_str())
        .await
        .context("Failed to write unified slot")?;

    let message = SpaceSyncMessage::space_changed(body.space_id.clone(), source_app, timestamp);
    info!("Publishing {}", message);

    let delivered = state
        .bus
        .post(&channel_name, message)
        .await
        .context("Failed to post space change")?;

    json_response::deliver_serialized_json(
        &PublishResponse {
            space_id: body.space_id,
            timestamp,
            delivered,
        },
        StatusCode::OK,
    )
}
