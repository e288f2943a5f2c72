//! Configuration loading and validation
//!
//! Pagehaul is configured from a TOML file with three sections: `[engine]`
//! (fetch engine options), `[crawl]` (listing location and pacing), and
//! `[output]` (database and media destinations).

pub mod parser;
pub mod types;

pub use parser::{load_config, validate};
pub use types::{Config, CrawlSection, EngineSection, OutputSection};
