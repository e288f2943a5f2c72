//! End-to-end crawl tests against a mock HTTP server
//!
//! These exercise the whole pipeline: a paginated listing endpoint whose
//! pages schedule their successors from inside response callbacks, media
//! fetches per discovered item, SQLite persistence, and idempotent media
//! writes. The crawl's only termination signal is the engine's join-counter.

use futures::FutureExt;
use pagehaul::config::{Config, CrawlSection, EngineSection, OutputSection};
use pagehaul::storage::ItemStore;
use pagehaul::{Crawler, FetchedResponse, HaulError};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(dir: &TempDir, server: &MockServer) -> Config {
    Config {
        engine: EngineSection {
            user_agent: "pagehaul-test".to_string(),
            asynchronous: true,
        },
        crawl: CrawlSection {
            listing_base: format!("{}/feed?page=", server.uri()),
            start_page: 1,
            media_delay_ms: 1,
            media_rewrite: None,
        },
        output: OutputSection {
            database_path: dir.path().join("haul.db").to_string_lossy().into_owned(),
            media_dir: dir.path().join("media").to_string_lossy().into_owned(),
        },
    }
}

/// Listing payload for page `page` of `page_count`, with `media` URLs on a
/// single item.
fn listing_body(page: u32, page_count: u32, media: &[String]) -> String {
    let media_json: Vec<String> = media.iter().map(|m| format!("\"{}\"", m)).collect();
    format!(
        r#"{{
            "status": "ok",
            "current_page": {page},
            "page_count": {page_count},
            "count": 1,
            "items": [
                {{
                    "id": "item-{page}",
                    "post_id": "post-{page}",
                    "date": "2018-08-22 08:17:15",
                    "text": "page {page}",
                    "media": [{media}]
                }}
            ]
        }}"#,
        page = page,
        page_count = page_count,
        media = media_json.join(",")
    )
}

async fn mount_listing_page(server: &MockServer, page: u32, page_count: u32, media: &[String]) {
    Mock::given(method("GET"))
        .and(path("/feed"))
        .and(query_param("page", page.to_string()))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(listing_body(page, page_count, media)),
        )
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_media(server: &MockServer, media_path: &str) {
    Mock::given(method("GET"))
        .and(path(media_path))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"image-bytes".to_vec()))
        .mount(server)
        .await;
}

fn count_media_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|rd| rd.count()).unwrap_or(0)
}

#[tokio::test]
async fn test_multi_page_crawl_drains_completely() {
    const PAGES: u32 = 3;
    const MEDIA_PER_PAGE: u32 = 2;

    let server = MockServer::start().await;
    for page in 1..=PAGES {
        let media: Vec<String> = (1..=MEDIA_PER_PAGE)
            .map(|m| format!("{}/media/p{}-{}.jpg", server.uri(), page, m))
            .collect();
        mount_listing_page(&server, page, PAGES, &media).await;
        for m in 1..=MEDIA_PER_PAGE {
            mount_media(&server, &format!("/media/p{}-{}.jpg", page, m)).await;
        }
    }

    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, &server);
    let crawler = Crawler::new(config.clone()).unwrap();

    // Count every successful exchange: pages plus media leaves.
    let responses = Arc::new(AtomicUsize::new(0));
    let errors = Arc::new(AtomicUsize::new(0));
    {
        let responses = responses.clone();
        crawler.engine().on_response(move |_r: &FetchedResponse| {
            let responses = responses.clone();
            async move {
                responses.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        });
    }
    {
        let errors = errors.clone();
        crawler.engine().on_error(move |_r: &FetchedResponse, _e: &HaulError| {
            let errors = errors.clone();
            async move {
                errors.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        });
    }

    crawler.run().await.unwrap();

    // wait() returned, so nothing may still be in flight.
    assert_eq!(crawler.engine().pending(), 0);
    assert_eq!(
        responses.load(Ordering::SeqCst),
        (PAGES + PAGES * MEDIA_PER_PAGE) as usize
    );
    assert_eq!(errors.load(Ordering::SeqCst), 0);

    // One item row per page, one media file per media URL.
    let store = ItemStore::open(Path::new(&config.output.database_path)).unwrap();
    assert_eq!(store.count_items().unwrap(), PAGES as u64);
    assert_eq!(
        count_media_files(Path::new(&config.output.media_dir)),
        (PAGES * MEDIA_PER_PAGE) as usize
    );
}

#[tokio::test]
async fn test_single_page_listing_does_not_fetch_page_two() {
    let server = MockServer::start().await;
    let media = vec![format!("{}/media/only.jpg", server.uri())];
    mount_listing_page(&server, 1, 1, &media).await;
    mount_media(&server, "/media/only.jpg").await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, &server);
    let crawler = Crawler::new(config).unwrap();

    let responses = Arc::new(AtomicUsize::new(0));
    let errors = Arc::new(AtomicUsize::new(0));
    {
        let responses = responses.clone();
        crawler.engine().on_response(move |_r: &FetchedResponse| {
            let responses = responses.clone();
            async move {
                responses.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        });
    }
    {
        let errors = errors.clone();
        crawler.engine().on_error(move |_r: &FetchedResponse, _e: &HaulError| {
            let errors = errors.clone();
            async move {
                errors.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        });
    }

    crawler.run().await.unwrap();

    // Exactly the page plus its one media fetch; a page-2 request would
    // have 404ed into the error counter (and tripped the page-1 mock's
    // expectation count on a retry).
    assert_eq!(responses.load(Ordering::SeqCst), 2);
    assert_eq!(errors.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_media_failures_do_not_halt_the_crawl() {
    let server = MockServer::start().await;
    let media = vec![
        format!("{}/media/present.jpg", server.uri()),
        format!("{}/media/missing.jpg", server.uri()),
    ];
    mount_listing_page(&server, 1, 1, &media).await;
    mount_media(&server, "/media/present.jpg").await;
    // No mock for missing.jpg: wiremock answers 404.

    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, &server);
    let crawler = Crawler::new(config.clone()).unwrap();

    let errors = Arc::new(AtomicUsize::new(0));
    {
        let errors = errors.clone();
        crawler.engine().on_error(move |_r: &FetchedResponse, _e: &HaulError| {
            let errors = errors.clone();
            async move {
                errors.fetch_add(1, Ordering::SeqCst);
            }
            .boxed()
        });
    }

    crawler.run().await.unwrap();

    assert_eq!(errors.load(Ordering::SeqCst), 1);
    assert_eq!(count_media_files(Path::new(&config.output.media_dir)), 1);
}

#[tokio::test]
async fn test_rerun_is_idempotent() {
    let server = MockServer::start().await;
    let media = vec![format!("{}/media/a.jpg", server.uri())];
    Mock::given(method("GET"))
        .and(path("/feed"))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing_body(1, 1, &media)))
        .mount(&server)
        .await;
    mount_media(&server, "/media/a.jpg").await;

    let dir = TempDir::new().unwrap();
    let config = test_config(&dir, &server);

    Crawler::new(config.clone()).unwrap().run().await.unwrap();
    Crawler::new(config.clone()).unwrap().run().await.unwrap();

    // Second run re-fetched everything but stored nothing new and left the
    // existing media file untouched.
    let store = ItemStore::open(Path::new(&config.output.database_path)).unwrap();
    assert_eq!(store.count_items().unwrap(), 1);
    assert_eq!(count_media_files(Path::new(&config.output.media_dir)), 1);
}

#[tokio::test]
async fn test_media_rewrite_applied_before_fetch() {
    let server = MockServer::start().await;
    let media = vec![format!("{}/media/small/a.jpg", server.uri())];
    mount_listing_page(&server, 1, 1, &media).await;
    // Only the rewritten variant exists.
    Mock::given(method("GET"))
        .and(path("/media/big/a.jpg"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"big-image".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir, &server);
    config.crawl.media_rewrite = Some(["small".to_string(), "big".to_string()]);

    let crawler = Crawler::new(config.clone()).unwrap();
    crawler.run().await.unwrap();

    assert!(Path::new(&config.output.media_dir).join("a.jpg").exists());
}

#[tokio::test]
async fn test_sync_engine_crawl_also_drains() {
    let server = MockServer::start().await;
    let media = vec![format!("{}/media/a.jpg", server.uri())];
    mount_listing_page(&server, 1, 1, &media).await;
    mount_media(&server, "/media/a.jpg").await;

    let dir = TempDir::new().unwrap();
    let mut config = test_config(&dir, &server);
    config.engine.asynchronous = false;

    let crawler = Crawler::new(config.clone()).unwrap();
    crawler.run().await.unwrap();

    assert_eq!(crawler.engine().pending(), 0);
    let store = ItemStore::open(Path::new(&config.output.database_path)).unwrap();
    assert_eq!(store.count_items().unwrap(), 1);
}
