use finbrief::crawl::{run_crawl, CrawlLimits};
use finbrief::fetch;
use finbrief::sources::SourceSpec;
use finbrief::store::{LinkStore, StoreSchema, PLACEHOLDER_NOT_FOUND};
use std::time::Duration;

fn test_source(base_url: &str, listing_paths: &[&str]) -> SourceSpec {
    SourceSpec {
        name: "testsite".to_string(),
        category: "Stock".to_string(),
        base_url: base_url.to_string(),
        listing_pages: listing_paths
            .iter()
            .map(|p| format!("{}{}", base_url, p))
            .collect(),
        listing_selectors: vec!["a.story".to_string()],
        content_selectors: vec![".caas-body".to_string()],
        link_patterns: vec!["/news/".to_string()],
        min_title_len: 10,
        store_file: "test_news.csv".to_string(),
        schema: StoreSchema::default(),
    }
}

fn test_limits() -> CrawlLimits {
    CrawlLimits {
        per_run_cap: 10,
        article_delay: Duration::from_millis(0),
        noise_floor: 50,
        utc_offset_hours: 9,
    }
}

fn listing_html(hrefs_and_titles: &[(&str, &str)]) -> String {
    let anchors: String = hrefs_and_titles
        .iter()
        .map(|(href, title)| format!(r#"<a class="story" href="{}">{}</a>"#, href, title))
        .collect();
    format!("<html><body>{}</body></html>", anchors)
}

fn article_html(body: &str) -> String {
    format!(
        r#"<html><body><div class="caas-body">{}</div></body></html>"#,
        body
    )
}

#[tokio::test]
async fn crawl_stores_new_articles_and_dedups_across_runs() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();

    let _listing = server
        .mock("GET", "/listing")
        .with_status(200)
        .with_body(listing_html(&[
            ("/news/alpha", "Alpha rallies on strong earnings"),
            ("/news/beta", "Beta slides after guidance cut"),
        ]))
        .create_async()
        .await;

    // Each article body must be fetched exactly once across both runs:
    // the second run dedups before fetching.
    let article_a = server
        .mock("GET", "/news/alpha")
        .with_status(200)
        .with_body(article_html("Alpha article body text"))
        .expect(1)
        .create_async()
        .await;
    let article_b = server
        .mock("GET", "/news/beta")
        .with_status(200)
        .with_body(article_html("Beta article body text"))
        .expect(1)
        .create_async()
        .await;

    let source = test_source(&server.url(), &["/listing"]);
    let store = LinkStore::new(dir.path().join("test_news.csv"), StoreSchema::default());
    let client = fetch::build_client(None, 5).unwrap();

    let written = run_crawl(&client, &source, &store, &test_limits())
        .await
        .expect("first crawl");
    assert_eq!(written, 2);

    let rows = store.load_recent(10);
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].title, "Alpha rallies on strong earnings");
    assert_eq!(rows[0].category, "Stock");
    assert_eq!(rows[0].content, "Alpha article body text");
    assert!(rows[0].link.ends_with("/news/alpha"));

    // Second run against the unchanged listing page: zero new records.
    let written = run_crawl(&client, &source, &store, &test_limits())
        .await
        .expect("second crawl");
    assert_eq!(written, 0);
    assert_eq!(store.load_recent(10).len(), 2);

    article_a.assert_async().await;
    article_b.assert_async().await;
}

#[tokio::test]
async fn duplicate_anchor_on_same_page_fetched_once() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();

    let _listing = server
        .mock("GET", "/listing")
        .with_status(200)
        .with_body(listing_html(&[
            ("/news/gamma", "Gamma surges on merger speculation"),
            ("/news/gamma", "Gamma surges on merger speculation"),
        ]))
        .create_async()
        .await;
    let article = server
        .mock("GET", "/news/gamma")
        .with_status(200)
        .with_body(article_html("Gamma article body"))
        .expect(1)
        .create_async()
        .await;

    let source = test_source(&server.url(), &["/listing"]);
    let store = LinkStore::new(dir.path().join("test_news.csv"), StoreSchema::default());
    let client = fetch::build_client(None, 5).unwrap();

    let written = run_crawl(&client, &source, &store, &test_limits())
        .await
        .unwrap();
    assert_eq!(written, 1);
    article.assert_async().await;
}

#[tokio::test]
async fn per_run_cap_bounds_article_fetches() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();

    let _listing = server
        .mock("GET", "/listing")
        .with_status(200)
        .with_body(listing_html(&[
            ("/news/one", "First headline long enough to pass"),
            ("/news/two", "Second headline long enough to pass"),
            ("/news/three", "Third headline long enough to pass"),
        ]))
        .create_async()
        .await;
    let _article = server
        .mock("GET", mockito::Matcher::Regex("^/news/".to_string()))
        .with_status(200)
        .with_body(article_html("Some article body"))
        .expect(2)
        .create_async()
        .await;

    let source = test_source(&server.url(), &["/listing"]);
    let store = LinkStore::new(dir.path().join("test_news.csv"), StoreSchema::default());
    let client = fetch::build_client(None, 5).unwrap();

    let limits = CrawlLimits {
        per_run_cap: 2,
        ..test_limits()
    };
    let written = run_crawl(&client, &source, &store, &limits).await.unwrap();
    assert_eq!(written, 2);
}

#[tokio::test]
async fn failed_article_fetch_degrades_to_placeholder() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();

    let _listing = server
        .mock("GET", "/listing")
        .with_status(200)
        .with_body(listing_html(&[("/news/gone", "Vanished article headline here")]))
        .create_async()
        .await;
    let _article = server
        .mock("GET", "/news/gone")
        .with_status(404)
        .create_async()
        .await;

    let source = test_source(&server.url(), &["/listing"]);
    let store = LinkStore::new(dir.path().join("test_news.csv"), StoreSchema::default());
    let client = fetch::build_client(None, 5).unwrap();

    let written = run_crawl(&client, &source, &store, &test_limits())
        .await
        .unwrap();
    assert_eq!(written, 1);

    let rows = store.load_recent(1);
    assert_eq!(rows[0].content, PLACEHOLDER_NOT_FOUND);
    assert_eq!(rows[0].title, "Vanished article headline here");
}

#[tokio::test]
async fn listing_failure_loses_only_that_page() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();

    let _broken = server
        .mock("GET", "/broken")
        .with_status(500)
        .create_async()
        .await;
    let _listing = server
        .mock("GET", "/listing")
        .with_status(200)
        .with_body(listing_html(&[("/news/delta", "Delta gains on upbeat outlook")]))
        .create_async()
        .await;
    let _article = server
        .mock("GET", "/news/delta")
        .with_status(200)
        .with_body(article_html("Delta article body"))
        .create_async()
        .await;

    let source = test_source(&server.url(), &["/broken", "/listing"]);
    let store = LinkStore::new(dir.path().join("test_news.csv"), StoreSchema::default());
    let client = fetch::build_client(None, 5).unwrap();

    let written = run_crawl(&client, &source, &store, &test_limits())
        .await
        .expect("crawl survives a dead listing page");
    assert_eq!(written, 1);
}

#[tokio::test]
async fn short_titles_and_foreign_hrefs_are_ignored() {
    let mut server = mockito::Server::new_async().await;
    let dir = tempfile::tempdir().unwrap();

    let _listing = server
        .mock("GET", "/listing")
        .with_status(200)
        .with_body(listing_html(&[
            ("/news/ok", "A real headline that is long enough"),
            ("/news/short", "Tiny"),
            ("/quote/AAPL", "Apple quote page navigation anchor"),
        ]))
        .create_async()
        .await;
    let _article = server
        .mock("GET", "/news/ok")
        .with_status(200)
        .with_body(article_html("Body of the only real article"))
        .expect(1)
        .create_async()
        .await;

    let source = test_source(&server.url(), &["/listing"]);
    let store = LinkStore::new(dir.path().join("test_news.csv"), StoreSchema::default());
    let client = fetch::build_client(None, 5).unwrap();

    let written = run_crawl(&client, &source, &store, &test_limits())
        .await
        .unwrap();
    assert_eq!(written, 1);
    assert!(store.load_recent(1)[0].link.ends_with("/news/ok"));
}
