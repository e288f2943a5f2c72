//! Fetch engine core
//!
//! This module implements the HTTP exchange pipeline:
//! - Request construction with scheme/header/body normalization
//! - Ordered request/response/error callback dispatch
//! - Exchange execution and outcome classification
//! - Join-counter completion tracking for a dynamically-growing crawl

mod callbacks;
mod engine;
mod join;
mod request;

pub use callbacks::{CallbackRegistry, ErrorCallback, RequestCallback, ResponseCallback};
pub use engine::{Engine, EngineConfig, FetchedResponse};
pub use join::JoinCounter;
pub use request::{OutboundRequest, RequestBody};
