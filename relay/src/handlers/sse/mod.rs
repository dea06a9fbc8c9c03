mod sse;

pub use sse::{SseStreamBuilder, handle_space_events};
