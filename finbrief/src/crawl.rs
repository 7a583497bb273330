//! The crawl job: discover headlines on listing pages, filter against
//! links seen in previous runs, fetch the surviving articles and append
//! them to the source's store.
//!
//! One invocation is one batch run: known links are loaded once, work
//! is bounded by a per-run cap, and a single append at the end persists
//! everything found. A listing-page failure only loses that page;
//! an article-fetch failure only degrades that one record.

use anyhow::{Context, Result};
use chrono::{FixedOffset, Utc};
use reqwest::Client;
use scraper::Html;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

use crate::extract::{self, Headline};
use crate::fetch;
use crate::sources::SourceSpec;
use crate::store::{LinkStore, NewsRecord, PLACEHOLDER_NOT_FOUND};

/// Runtime knobs for one crawl run, resolved from configuration.
#[derive(Debug, Clone)]
pub struct CrawlLimits {
    /// Maximum article fetches per run (bounds outbound load, not storage)
    pub per_run_cap: usize,
    /// Fixed pause between consecutive article fetches
    pub article_delay: Duration,
    /// Paragraph noise floor for fallback extraction
    pub noise_floor: usize,
    /// Fixed offset applied to captured-at timestamps
    pub utc_offset_hours: i32,
}

impl Default for CrawlLimits {
    fn default() -> Self {
        CrawlLimits {
            per_run_cap: 10,
            article_delay: Duration::from_secs(1),
            noise_floor: 50,
            utc_offset_hours: 9,
        }
    }
}

/// Crawl one source and append the newly discovered records.
/// Returns the number of records written.
pub async fn run_crawl(
    client: &Client,
    source: &SourceSpec,
    store: &LinkStore,
    limits: &CrawlLimits,
) -> Result<usize> {
    let listing_selectors = extract::parse_selectors(&source.listing_selectors)
        .with_context(|| format!("listing selectors for source {}", source.name))?;
    let content_selectors = extract::parse_selectors(&source.content_selectors)
        .with_context(|| format!("content selectors for source {}", source.name))?;
    let base_url = Url::parse(&source.base_url)
        .with_context(|| format!("base URL for source {}", source.name))?;

    // Loaded once per run; re-reading the file per link would be O(n^2).
    let known = store.load_known_links();
    info!(source = %source.name, known = known.len(), "starting crawl");

    let mut seen_this_run: HashSet<String> = HashSet::new();
    let mut results: Vec<NewsRecord> = Vec::new();

    'listing: for listing_url in &source.listing_pages {
        // A dead listing page loses only that page's headlines.
        let html = match fetch::fetch_page(client, listing_url).await {
            Ok(body) => body,
            Err(e) => {
                warn!(source = %source.name, url = %listing_url, error = %e, "listing fetch failed, skipping page");
                continue;
            }
        };

        let headlines = {
            let document = Html::parse_document(&html);
            extract::discover_headlines(&document, &listing_selectors)
        };
        info!(source = %source.name, url = %listing_url, count = headlines.len(), "discovered headlines");

        for headline in headlines {
            if !passes_filters(&headline, source) {
                continue;
            }

            let link = match normalize_link(&base_url, &headline.href) {
                Some(link) => link,
                None => continue,
            };

            // Dedup against prior runs and against a mirrored anchor
            // elsewhere on the same page; no re-fetch either way.
            if known.contains(&link) || seen_this_run.contains(&link) {
                continue;
            }
            seen_this_run.insert(link.clone());

            if !results.is_empty() {
                tokio::time::sleep(limits.article_delay).await;
            }

            let content = fetch_article_content(client, &link, &content_selectors, limits.noise_floor).await;
            results.push(NewsRecord {
                captured_at: current_timestamp(limits.utc_offset_hours),
                category: source.category.clone(),
                title: headline.title,
                content,
                link,
            });

            if results.len() >= limits.per_run_cap {
                info!(source = %source.name, cap = limits.per_run_cap, "per-run cap reached");
                break 'listing;
            }
        }
    }

    if results.is_empty() {
        info!(source = %source.name, "no new articles found");
        return Ok(0);
    }

    let written = store.append(&results)?;
    info!(source = %source.name, written, "crawl complete");
    Ok(written)
}

/// Cheap pre-filters applied before normalization: discard navigation
/// and ad anchors by title length and href shape.
fn passes_filters(headline: &Headline, source: &SourceSpec) -> bool {
    if headline.title.chars().count() < source.min_title_len {
        return false;
    }
    source
        .link_patterns
        .iter()
        .any(|pattern| headline.href.contains(pattern.as_str()))
}

/// Resolve a possibly-relative href against the source's base URL.
fn normalize_link(base: &Url, href: &str) -> Option<String> {
    base.join(href).ok().map(|u| u.to_string())
}

/// Fetch one article and extract its body. Any failure here degrades to
/// the placeholder; the record is still worth storing.
async fn fetch_article_content(
    client: &Client,
    link: &str,
    content_selectors: &[scraper::Selector],
    noise_floor: usize,
) -> String {
    match fetch::fetch_page(client, link).await {
        Ok(body) => {
            let document = Html::parse_document(&body);
            extract::extract_content(&document, content_selectors, noise_floor)
                .unwrap_or_else(|| {
                    warn!(url = %link, "no selector matched and no paragraphs above noise floor");
                    PLACEHOLDER_NOT_FOUND.to_string()
                })
        }
        Err(e) => {
            warn!(url = %link, error = %e, "article fetch failed, storing placeholder");
            PLACEHOLDER_NOT_FOUND.to_string()
        }
    }
}

/// Crawl-time timestamp in a fixed local offset (KST by default),
/// formatted the way the store has always recorded it.
fn current_timestamp(utc_offset_hours: i32) -> String {
    let offset = FixedOffset::east_opt(utc_offset_hours * 3600)
        .unwrap_or_else(|| FixedOffset::east_opt(0).expect("zero offset is valid"));
    Utc::now()
        .with_timezone(&offset)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
