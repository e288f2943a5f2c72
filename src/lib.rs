//! Pagehaul: an asynchronous fetch engine driving a self-expanding crawl
//!
//! This crate implements an HTTP fetch engine with a callback-hook pipeline
//! and a crawl orchestrator built on top of it: each fetched listing page may
//! enqueue further fetches (the next page, discovered media URLs), and a
//! join-counter tells the crawl when the dynamically-growing set of in-flight
//! work has drained.

pub mod config;
pub mod crawl;
pub mod fetch;
pub mod storage;

use thiserror::Error;

/// Main error type for Pagehaul operations
#[derive(Debug, Error)]
pub enum HaulError {
    #[error("Invalid URL {url}: {source}")]
    InvalidUrl {
        url: String,
        source: url::ParseError,
    },

    #[error("Transport error for {url}: {source}")]
    Transport {
        url: String,
        source: reqwest::Error,
    },

    #[error("HTTP status {status}: {reason}")]
    Status { status: u16, reason: String },

    #[error("Failed to decode listing payload from {url}: {source}")]
    Decode {
        url: String,
        source: serde_json::Error,
    },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias for Pagehaul operations
pub type Result<T> = std::result::Result<T, HaulError>;

// Re-export commonly used types
pub use config::Config;
pub use crawl::Crawler;
pub use fetch::{Engine, EngineConfig, FetchedResponse, OutboundRequest, RequestBody};
