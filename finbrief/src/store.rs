//! Append-only CSV store of crawled articles.
//!
//! One file per source, UTF-8 with BOM, header row
//! `Date,Category,Title,Content,Link`. The link column is the dedup
//! key: uniqueness is guaranteed by pre-filtering against
//! [`LinkStore::load_known_links`] before appending, not by any
//! constraint in the file itself.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const UTF8_BOM: &[u8] = b"\xef\xbb\xbf";

pub const HEADER: [&str; 5] = ["Date", "Category", "Title", "Content", "Link"];

/// Placeholder stored when article body extraction fails. The record is
/// still kept: title + link without a body is worth having.
pub const PLACEHOLDER_NOT_FOUND: &str = "Content extraction failed";

/// One crawled article.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsRecord {
    /// Crawl-time timestamp, formatted in a fixed local offset
    pub captured_at: String,
    pub category: String,
    pub title: String,
    pub content: String,
    /// Canonical absolute URL; the deduplication key
    pub link: String,
}

/// Column roles within a store file.
///
/// The canonical layout is the 5-column schema above; the descriptor
/// exists so a reader never has to guess column positions from the
/// file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreSchema {
    pub date_col: usize,
    pub category_col: usize,
    pub title_col: usize,
    pub content_col: usize,
    pub link_col: usize,
}

impl Default for StoreSchema {
    fn default() -> Self {
        StoreSchema {
            date_col: 0,
            category_col: 1,
            title_col: 2,
            content_col: 3,
            link_col: 4,
        }
    }
}

/// Durable, append-only record store backed by a single CSV file.
#[derive(Debug, Clone)]
pub struct LinkStore {
    path: PathBuf,
    schema: StoreSchema,
}

impl LinkStore {
    pub fn new(path: impl Into<PathBuf>, schema: StoreSchema) -> Self {
        LinkStore {
            path: path.into(),
            schema,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the set of links already persisted.
    ///
    /// A missing file means a first run; a corrupt file is logged and
    /// treated as empty. Re-storing a few duplicates beats refusing to
    /// crawl.
    pub fn load_known_links(&self) -> HashSet<String> {
        if !self.path.exists() {
            return HashSet::new();
        }

        let mut reader = match csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
        {
            Ok(r) => r,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to open store, treating as empty");
                return HashSet::new();
            }
        };

        let mut links = HashSet::new();
        for result in reader.records() {
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "skipping unreadable store row");
                    continue;
                }
            };
            if let Some(link) = record.get(self.schema.link_col) {
                if !link.is_empty() {
                    links.insert(link.to_string());
                }
            }
        }
        links
    }

    /// Append records in call order, writing the BOM + header only when
    /// the file is new or empty. Returns the number of rows written.
    pub fn append(&self, records: &[NewsRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create store directory: {}", parent.display())
                })?;
            }
        }

        let existing_len = std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("failed to open store for append: {}", self.path.display()))?;

        if existing_len == 0 {
            // BOM first so spreadsheet tools pick up the encoding
            file.write_all(UTF8_BOM)
                .context("failed to write store BOM")?;
        }

        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);

        if existing_len == 0 {
            writer.write_record(HEADER).context("failed to write store header")?;
        }

        for record in records {
            writer
                .write_record([
                    record.captured_at.as_str(),
                    record.category.as_str(),
                    record.title.as_str(),
                    record.content.as_str(),
                    record.link.as_str(),
                ])
                .context("failed to write store row")?;
        }
        writer.flush().context("failed to flush store")?;

        info!(path = %self.path.display(), count = records.len(), "appended records to store");
        Ok(records.len())
    }

    /// Most recent `n` records in stored order (the tail of the file).
    /// Unreadable rows are skipped the same way `load_known_links`
    /// skips them.
    pub fn load_recent(&self, n: usize) -> Vec<NewsRecord> {
        if !self.path.exists() {
            return Vec::new();
        }

        let mut reader = match csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)
        {
            Ok(r) => r,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "failed to open store for reading");
                return Vec::new();
            }
        };

        let s = self.schema;
        let rows: Vec<NewsRecord> = reader
            .records()
            .filter_map(|result| match result {
                Ok(r) => Some(r),
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "skipping unreadable store row");
                    None
                }
            })
            .filter_map(|record| {
                Some(NewsRecord {
                    captured_at: record.get(s.date_col)?.to_string(),
                    category: record.get(s.category_col)?.to_string(),
                    title: record.get(s.title_col)?.to_string(),
                    content: record.get(s.content_col).unwrap_or("").to_string(),
                    link: record.get(s.link_col)?.to_string(),
                })
            })
            .collect();

        let skip = rows.len().saturating_sub(n);
        rows.into_iter().skip(skip).collect()
    }
}
