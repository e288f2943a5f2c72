//! Crawl orchestrator
//!
//! The orchestrator is a pair of callbacks registered on the fetch engine:
//! one response observer that expands listing pages into further fetches
//! (the next page, then each discovered media URL) and persists what it
//! finds, and one error observer that logs failures and lets the rest of
//! the crawl continue.
//!
//! Its correctness rests entirely on the engine's join-counter discipline:
//! every fetch scheduled from inside a callback increments the counter
//! before the callback proceeds, so `Engine::wait` returns only once every
//! transitively-spawned fetch has completed.

pub mod model;

use crate::config::Config;
use crate::fetch::{Engine, EngineConfig, FetchedResponse};
use crate::storage::{file_name_for, ItemStore, MediaStore};
use crate::Result;
use futures::FutureExt;
use model::PageListing;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Shared state captured by the orchestrator's callbacks.
struct CrawlContext {
    engine: Engine,
    store: Mutex<ItemStore>,
    media: MediaStore,
    listing_base: String,
    media_delay: Duration,
    media_rewrite: Option<[String; 2]>,
}

impl CrawlContext {
    fn page_url(&self, page: u32) -> String {
        format!("{}{}", self.listing_base, page)
    }

    /// Applies the optional media variant rewrite (first occurrence only).
    fn media_target(&self, url: &str) -> String {
        match &self.media_rewrite {
            Some([from, to]) => url.replacen(from.as_str(), to.as_str(), 1),
            None => url.to_string(),
        }
    }

    async fn handle_response(&self, response: &FetchedResponse) {
        if response.request.url.as_str().starts_with(&self.listing_base) {
            self.handle_listing(response).await;
        } else {
            self.handle_media(response).await;
        }
    }

    /// Expands one listing page.
    ///
    /// The next page is scheduled BEFORE this page's items are processed:
    /// its counter increment lands while the current exchange is still
    /// counted, so the join-counter can never transiently drain between
    /// pages. This ordering is load-bearing; do not reorder.
    async fn handle_listing(&self, response: &FetchedResponse) {
        let url = response.request.url.as_str();
        let listing: PageListing = match serde_json::from_slice(&response.body) {
            Ok(listing) => listing,
            Err(source) => {
                let error = crate::HaulError::Decode {
                    url: url.to_string(),
                    source,
                };
                tracing::warn!("{}", error);
                return;
            }
        };
        tracing::debug!(
            "listing page {}/{} with {} items",
            listing.current_page,
            listing.page_count,
            listing.items.len()
        );

        if listing.current_page < listing.page_count {
            let next = self.page_url(listing.current_page + 1);
            if let Err(error) = self.engine.get(&next).await {
                tracing::warn!("failed to schedule next page {}: {}", next, error);
            }
        }

        if !listing.items.is_empty() {
            let inserted = {
                let mut store = self.store.lock().unwrap();
                store.insert_items(&listing.items)
            };
            match inserted {
                Ok(rows) => tracing::debug!("stored {} new items from {}", rows, url),
                Err(error) => tracing::warn!("failed to store items from {}: {}", url, error),
            }
        }

        for item in &listing.items {
            for media_url in &item.media {
                let target = self.media_target(media_url);
                // Crude fixed pacing before each media fetch. The increment
                // happens inside get, on this task, before we move on.
                tokio::time::sleep(self.media_delay).await;
                if let Err(error) = self.engine.get(&target).await {
                    tracing::warn!("failed to schedule media {}: {}", target, error);
                }
            }
        }
    }

    /// Persists one media leaf, skipping destinations that already exist.
    async fn handle_media(&self, response: &FetchedResponse) {
        let name = file_name_for(&response.request.url);
        match self.media.save(&name, &response.body) {
            Ok(Some(size)) => {
                tracing::info!(
                    "saved {} ({} bytes, status {})",
                    self.media.root().join(&name).display(),
                    size,
                    response.status
                );
            }
            Ok(None) => {
                tracing::debug!("skipping existing media file {}", name);
            }
            Err(error) => {
                tracing::warn!("failed to save media from {}: {}", response.request.url, error);
            }
        }
    }
}

/// Drives a recursive listing-and-media crawl over one fetch engine.
pub struct Crawler {
    engine: Engine,
    context: Arc<CrawlContext>,
    start_page: u32,
}

impl Crawler {
    /// Builds the engine and sinks, and registers the orchestrator's one
    /// response callback and one error callback.
    pub fn new(config: Config) -> Result<Self> {
        let engine = Engine::new(EngineConfig {
            user_agent: config.engine.user_agent.clone(),
            asynchronous: config.engine.asynchronous,
        });
        let store = ItemStore::open(Path::new(&config.output.database_path))?;
        let media = MediaStore::new(Path::new(&config.output.media_dir))?;

        let context = Arc::new(CrawlContext {
            engine: engine.clone(),
            store: Mutex::new(store),
            media,
            listing_base: config.crawl.listing_base.clone(),
            media_delay: Duration::from_millis(config.crawl.media_delay_ms),
            media_rewrite: config.crawl.media_rewrite.clone(),
        });

        {
            let context = Arc::clone(&context);
            engine.on_response(move |response: &FetchedResponse| {
                let context = Arc::clone(&context);
                async move { context.handle_response(response).await }.boxed()
            });
        }
        engine.on_error(|response: &FetchedResponse, error: &crate::HaulError| {
            let url = response.request.url.to_string();
            let message = error.to_string();
            async move {
                tracing::warn!("fetch failed for {}: {}", url, message);
            }
            .boxed()
        });

        Ok(Self {
            engine,
            context,
            start_page: config.crawl.start_page,
        })
    }

    /// The engine this crawl runs on.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Fetches the start page and blocks until the whole dynamically-grown
    /// crawl has drained.
    pub async fn run(&self) -> Result<()> {
        let start = self.context.page_url(self.start_page);
        tracing::info!("starting crawl from {}", start);
        self.engine.get(&start).await?;
        self.engine.wait().await;
        tracing::info!("crawl drained, all in-flight fetches completed");
        Ok(())
    }
}
