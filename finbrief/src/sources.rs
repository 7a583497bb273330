//! Source catalog: per-site descriptors for the crawl job.
//!
//! Everything fragile about a site (listing URLs, selector chains,
//! link patterns) lives here, so the crawl algorithm itself stays
//! site-agnostic. Callers pick a source by name; nothing is inferred
//! from file paths.

use std::path::{Path, PathBuf};

use crate::store::StoreSchema;

/// Descriptor for one news site.
#[derive(Debug, Clone)]
pub struct SourceSpec {
    pub name: String,
    /// Category label stamped on every record from this source
    pub category: String,
    /// Base URL used to resolve relative hrefs
    pub base_url: String,
    /// Listing pages enumerating article links
    pub listing_pages: Vec<String>,
    /// Ordered fallback chain for discovering headline anchors
    pub listing_selectors: Vec<String>,
    /// Ordered fallback chain for article body containers
    pub content_selectors: Vec<String>,
    /// Href must contain at least one of these substrings to be
    /// considered an article link (cheap nav/ad filter)
    pub link_patterns: Vec<String>,
    /// Headlines shorter than this are navigation, not articles
    pub min_title_len: usize,
    /// Store file name under the configured data directory
    pub store_file: String,
    pub schema: StoreSchema,
}

impl SourceSpec {
    pub fn store_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.store_file)
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Yahoo Finance stock-market news. Selectors change often; `.caas-body`
/// has been the body container for a while, `.body-wrap` is an older
/// revision kept as fallback.
pub fn yahoo_finance() -> SourceSpec {
    SourceSpec {
        name: "yahoo".to_string(),
        category: "Stock".to_string(),
        base_url: "https://finance.yahoo.com".to_string(),
        listing_pages: strings(&["https://finance.yahoo.com/topic/stock-market-news/"]),
        listing_selectors: strings(&["a[href*='/news/']", "a"]),
        content_selectors: strings(&[".caas-body", ".body-wrap"]),
        link_patterns: strings(&["/news/", "finance.yahoo.com"]),
        min_title_len: 30,
        store_file: "yahoo_news.csv".to_string(),
        schema: StoreSchema::default(),
    }
}

/// Naver Finance economy section. Titles are shorter than Yahoo's, so
/// the length filter is looser.
pub fn naver_finance() -> SourceSpec {
    SourceSpec {
        name: "naver".to_string(),
        category: "Economy".to_string(),
        base_url: "https://news.naver.com".to_string(),
        listing_pages: strings(&[
            "https://news.naver.com/breakingnews/section/101/259",
            "https://finance.naver.com/news/mainnews.naver?&page=1",
        ]),
        listing_selectors: strings(&[".sa_text_title", ".mainNewsList li dl dd a"]),
        content_selectors: strings(&["#dic_area", "#newsct_article", ".articleCont"]),
        link_patterns: strings(&["/article/", "news.naver.com", "article_id="]),
        min_title_len: 10,
        store_file: "naver_news.csv".to_string(),
        schema: StoreSchema::default(),
    }
}

/// All built-in sources, in crawl order.
pub fn all_sources() -> Vec<SourceSpec> {
    vec![naver_finance(), yahoo_finance()]
}

/// Look up a built-in source by name.
pub fn by_name(name: &str) -> Option<SourceSpec> {
    all_sources().into_iter().find(|s| s.name == name)
}
