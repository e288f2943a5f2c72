use serde::Deserialize;

/// Main configuration structure for Pagehaul
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub engine: EngineSection,
    pub crawl: CrawlSection,
    pub output: OutputSection,
}

/// Fetch engine configuration
#[derive(Debug, Clone, Deserialize)]
pub struct EngineSection {
    /// Outbound User-Agent header value
    #[serde(rename = "user-agent")]
    pub user_agent: String,

    /// Run exchanges concurrently (one task per in-flight fetch)
    #[serde(rename = "async", default = "default_async")]
    pub asynchronous: bool,
}

/// Crawl orchestration configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlSection {
    /// Listing URL prefix; the page number is appended to form a page URL,
    /// and responses whose URL starts with this prefix are treated as
    /// listing pages rather than media leaves
    #[serde(rename = "listing-base")]
    pub listing_base: String,

    /// First page to fetch
    #[serde(rename = "start-page", default = "default_start_page")]
    pub start_page: u32,

    /// Fixed pacing delay applied before scheduling each media fetch
    /// (milliseconds; crude, non-adaptive)
    #[serde(rename = "media-delay-ms", default = "default_media_delay_ms")]
    pub media_delay_ms: u64,

    /// Optional [from, to] substring rewrite applied to each media URL
    /// before fetching (e.g. to request a larger image variant)
    #[serde(rename = "media-rewrite", default)]
    pub media_rewrite: Option<[String; 2]>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputSection {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Directory media files are written into
    #[serde(rename = "media-dir")]
    pub media_dir: String,
}

fn default_async() -> bool {
    true
}

fn default_start_page() -> u32 {
    1
}

fn default_media_delay_ms() -> u64 {
    50
}
