use std::collections::HashMap;

use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::{Request, StatusCode};
use serde::de::DeserializeOwned;
use tracing::warn;

/// Largest request body the relay will read.
pub const MAX_BODY_BYTES: usize = 16 * 1024;

/// Why a JSON body could not be used, with the status to answer with.
#[derive(Debug)]
pub struct BodyRejection {
    pub status: StatusCode,
    pub code: &'static str,
    pub message: String,
}

/// Read at most [`MAX_BODY_BYTES`] and deserialize them as JSON.
pub async fn read_json_body<T: DeserializeOwned>(
    req: Request<hyper::body::Incoming>,
) -> Result<T, BodyRejection> {
    let collected = Limited::new(req.into_body(), MAX_BODY_BYTES)
        .collect()
        .await
        .map_err(|e| {
            if e.downcast_ref::<LengthLimitError>().is_some() {
                BodyRejection {
                    status: StatusCode::PAYLOAD_TOO_LARGE,
                    code: "BODY_TOO_LARGE",
                    message: format!("Body exceeds {} bytes", MAX_BODY_BYTES),
                }
            } else {
                warn!("Failed to read request body: {}", e);
                BodyRejection {
                    status: StatusCode::BAD_REQUEST,
                    code: "BAD_BODY",
                    message: "Failed to read request body".to_string(),
                }
            }
        })?;

    serde_json::from_slice(&collected.to_bytes()).map_err(|e| BodyRejection {
        status: StatusCode::BAD_REQUEST,
        code: "INVALID_JSON",
        message: e.to_string(),
    })
}

/// Parse query-string params into a `HashMap`
pub fn parse_query<B>(req: &Request<B>) -> HashMap<String, String> {
    form_urlencoded::parse(req.uri().query().unwrap_or("").as_bytes())
        .into_owned()
        .collect()
}
