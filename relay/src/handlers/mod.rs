pub mod http;
pub mod sse;

use crate::handlers::http::routes::Router;
use crate::handlers::http::{health, space};

/// Every endpoint the relay serves.
pub fn build_router() -> Router {
    Router::new()
        .get("/health", health::handle_health)
        .get("/api/space", space::handle_get_space)
        .post("/api/space", space::handle_publish_space)
        .get("/api/events", sse::handle_space_events)
}
