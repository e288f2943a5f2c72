//! Pagehaul main entry point
//!
//! Command-line interface for the Pagehaul listing-and-media crawler.

use anyhow::Context;
use clap::Parser;
use pagehaul::config::load_config;
use pagehaul::Crawler;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Pagehaul: fetch a paginated listing and haul home its media
///
/// Pagehaul walks a paginated listing API, stores every discovered item in
/// SQLite, and downloads each item's media files to disk. The crawl expands
/// itself: every page schedules the next one until the reported page count
/// is reached.
#[derive(Parser, Debug)]
#[command(name = "pagehaul")]
#[command(version = "1.0.0")]
#[command(about = "Paginated listing crawler with media download", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Override the configured start page
    #[arg(long, value_name = "PAGE")]
    start_page: Option<u32>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let mut config = load_config(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;

    if let Some(page) = cli.start_page {
        config.crawl.start_page = page;
    }

    tracing::info!(
        "Listing base: {} (start page {}, async: {})",
        config.crawl.listing_base,
        config.crawl.start_page,
        config.engine.asynchronous
    );

    let crawler = Crawler::new(config).context("failed to initialize crawler")?;
    crawler.run().await.context("crawl failed")?;

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("pagehaul=info,warn"),
            1 => EnvFilter::new("pagehaul=debug,info"),
            2 => EnvFilter::new("pagehaul=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
