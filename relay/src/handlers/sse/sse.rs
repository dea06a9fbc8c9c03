use bytes::Bytes;
use futures_util::StreamExt;
use http_body_util::{BodyExt, StreamBody, combinators::BoxBody};
use hyper::{Request, Response, StatusCode, body::Frame, header::HeaderValue};
use shared::types::SpaceSyncMessage;
use std::convert::Infallible;
use tokio::sync::broadcast;
use tracing::{info, warn};
use uuid::Uuid;

use anyhow::{Context, Result};

use crate::AppState;
use crate::handlers::http::utils::{json_response, parse_query};

// ---------------------------------------------------------------------------
// SseStreamBuilder
// ---------------------------------------------------------------------------

/// Helpers for formatting SSE wire frames
pub struct SseStreamBuilder;

impl SseStreamBuilder {
    /// Standard SSE response headers
    pub fn response_headers() -> (HeaderValue, HeaderValue) {
        (
            HeaderValue::from_static("text/event-stream"),
            HeaderValue::from_static("no-cache"),
        )
    }

    /// Serialise a [`SpaceSyncMessage`] into a `space_changed` frame
    pub fn format_message(message: &SpaceSyncMessage) -> String {
        let data = serde_json::to_string(message).unwrap_or_else(|_| "{}".to_string());
        format!(
            "event: space_changed\ndata: {}\nid: {}\n\n",
            data,
            Uuid::new_v4()
        )
    }

    /// Emit a simple named event carrying arbitrary JSON data
    pub fn format_raw(event_type: &str, data: &serde_json::Value) -> String {
        let data_str = serde_json::to_string(data).unwrap_or_else(|_| "{}".to_string());
        format!(
            "event: {}\ndata: {}\nid: {}\n\n",
            event_type,
            data_str,
            Uuid::new_v4()
        )
    }
}

// ---------------------------------------------------------------------------
// SSE subscribe handler
// ---------------------------------------------------------------------------

/// Stream space changes made by every app except the subscriber itself.
///
/// ### Query parameters
/// | Param | Description                                         |
/// |-------|-----------------------------------------------------|
/// | `app` | Subscriber's app id; its own changes are not echoed |
///
/// ### Event sequence emitted
/// ```text
/// event: connected       handshake OK, carries the current space
/// event: space_changed   one per change from another app
/// event: reconnect       subscriber lagged; should re-read /api/space
/// ```
pub async fn handle_space_events(
    req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let params = parse_query(&req);
    let Some(app_id) = params
        .get("app")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
    else {
        warn!("SSE subscribe rejected: missing app param");
        return json_response::deliver_error_json(
            "MISSING_FIELD",
            "Missing required param: app",
            StatusCode::BAD_REQUEST,
        );
    };

    let (storage_key, channel_name) = {
        let cfg = state.config.read().await;
        (cfg.sync.storage_key.clone(), cfg.sync.channel_name.clone())
    };

    let current = state.store.get(&storage_key).await;
    let mut rx = state.bus.subscribe(&channel_name).await;

    info!("SSE subscribe: app={} channel={}", app_id, channel_name);

    let connected = SseStreamBuilder::format_raw(
        "connected",
        &serde_json::json!({ "app": app_id, "spaceId": current }),
    );
    let (content_type, cache_control) = SseStreamBuilder::response_headers();

    let stream = async_stream::stream! {
        yield Ok::<Bytes, Infallible>(Bytes::from(connected));

        loop {
            match rx.recv().await {
                Ok(message) if message.source_app == app_id => continue,
                Ok(message) => {
                    info!("SSE space change → app={}: {}", app_id, message);
                    yield Ok::<Bytes, Infallible>(Bytes::from(
                        SseStreamBuilder::format_message(&message),
                    ));
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("SSE app={} lagged by {} messages, sending reconnect hint", app_id, n);
                    yield Ok::<Bytes, Infallible>(Bytes::from(SseStreamBuilder::format_raw(
                        "reconnect",
                        &serde_json::json!({ "reason": "lagged", "missed": n }),
                    )));
                }
                Err(broadcast::error::RecvError::Closed) => {
                    info!("SSE channel closed: app={}", app_id);
                    break;
                }
            }
        }
    };

    let body = BodyExt::boxed(StreamBody::new(
        stream.map(|result| result.map(Frame::data)),
    ));

    Response::builder()
        .status(StatusCode::OK)
        .header("content-type", content_type)
        .header("cache-control", cache_control)
        .header("x-accel-buffering", "no")
        .body(body)
        .context("Failed to build SSE response")
}
