//! Selector-driven text extraction.
//!
//! News sites churn their markup, so every source carries an ordered
//! list of candidate selectors. The first selector that matches wins;
//! when none match, extraction falls back to collecting paragraph
//! blocks longer than a noise floor.

use anyhow::{anyhow, Result};
use scraper::{Html, Selector};

/// Parse a list of selector strings up front so a typo in a source
/// definition fails loudly instead of silently matching nothing.
pub fn parse_selectors<S: AsRef<str>>(selectors: &[S]) -> Result<Vec<Selector>> {
    selectors
        .iter()
        .map(|s| {
            let s = s.as_ref();
            Selector::parse(s).map_err(|e| anyhow!("invalid selector {:?}: {:?}", s, e))
        })
        .collect()
}

/// Extract the main text content of an article page.
///
/// Tries each selector in order and returns the visible text of the
/// first matching element, whitespace-normalized. Short-circuits on the
/// first match; multiple matches of the same selector are not merged.
///
/// If no selector matches, collects every `<p>` whose stripped text is
/// longer than `noise_floor` and joins them with a single space.
/// Returns `None` when that set is empty too.
pub fn extract_content(document: &Html, selectors: &[Selector], noise_floor: usize) -> Option<String> {
    for selector in selectors {
        if let Some(element) = document.select(selector).next() {
            let text = normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "));
            if !text.is_empty() {
                return Some(text);
            }
        }
    }

    // Paragraph fallback: anything above the noise floor is assumed to
    // be article text rather than navigation or boilerplate.
    let p = Selector::parse("p").ok()?;
    let paragraphs: Vec<String> = document
        .select(&p)
        .map(|el| normalize_whitespace(&el.text().collect::<Vec<_>>().join(" ")))
        .filter(|text| text.chars().count() > noise_floor)
        .collect();

    if paragraphs.is_empty() {
        None
    } else {
        Some(paragraphs.join(" "))
    }
}

/// A candidate headline found on a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Headline {
    pub title: String,
    pub href: String,
}

/// Discover `(title, href)` pairs on a listing page.
///
/// Listing selectors are also an ordered fallback chain: site redesigns
/// tend to replace the whole list container, so the first selector that
/// yields any anchors is taken and the rest are ignored.
pub fn discover_headlines(document: &Html, selectors: &[Selector]) -> Vec<Headline> {
    for selector in selectors {
        let found: Vec<Headline> = document
            .select(selector)
            .filter_map(|el| {
                let href = el.value().attr("href")?.to_string();
                let title = normalize_whitespace(&el.text().collect::<Vec<_>>().join(" "));
                if title.is_empty() {
                    return None;
                }
                Some(Headline { title, href })
            })
            .collect();
        if !found.is_empty() {
            return found;
        }
    }
    Vec::new()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
