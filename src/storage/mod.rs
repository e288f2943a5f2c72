//! Storage sinks for crawl output
//!
//! Two collaborator sinks consumed by the orchestrator's callbacks:
//! - `ItemStore`: SQLite persistence for decoded listing items
//! - `MediaStore`: on-disk media writing, idempotent on existing paths

mod files;
mod items;

pub use files::{file_name_for, MediaStore};
pub use items::ItemStore;
