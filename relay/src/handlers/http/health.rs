use std::convert::Infallible;

use anyhow::Result;
use bytes::Bytes;
use http_body_util::combinators::BoxBody;
use hyper::{Request, Response};
use serde_json::json;

use crate::AppState;
use crate::handlers::http::utils::json_response;

/// GET /health
pub async fn handle_health(
    _req: Request<hyper::body::Incoming>,
    state: AppState,
) -> Result<Response<BoxBody<Bytes, Infallible>>> {
    let channels = state.bus.channel_count().await;
    json_response::deliver_success_json(Some(json!({ "channels": channels })))
}
