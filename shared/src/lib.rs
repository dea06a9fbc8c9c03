pub mod checklist;
pub mod cleanup;
pub mod config;
pub mod sync;
pub mod types;
