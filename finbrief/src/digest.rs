//! The digest job: take the tail of each source's store, truncate
//! bodies to a character budget, render one prompt, ask the LLM for a
//! market-trend briefing and hand the result to the notifier.
//!
//! Truncation bounds the request size (token cost), nothing more. The
//! job owns no persisted state; it is a read-only consumer of the
//! stores the crawl job writes.

use anyhow::Result;
use std::sync::Arc;
use tracing::{error, info};

use crate::llm::{LlmProvider, LlmRequest};
use crate::notify::WebhookNotifier;
use crate::store::LinkStore;

/// Marker appended to a content field that was cut at the budget.
pub const TRUNCATION_MARKER: &str = "...";

/// One named store feeding the digest.
pub struct DigestSource {
    pub label: String,
    pub store: LinkStore,
}

/// Runtime knobs for one digest run.
#[derive(Debug, Clone)]
pub struct DigestLimits {
    /// Most-recent-N records taken per store
    pub window_size: usize,
    /// Per-record content character budget
    pub content_char_budget: usize,
    pub max_tokens: usize,
}

impl Default for DigestLimits {
    fn default() -> Self {
        DigestLimits {
            window_size: 15,
            content_char_budget: 500,
            max_tokens: 1000,
        }
    }
}

/// Truncate to `budget` characters, appending the marker when cut.
/// Counts characters, not bytes, so multi-byte titles cut cleanly.
pub fn truncate_content(content: &str, budget: usize) -> String {
    if content.chars().count() <= budget {
        content.to_string()
    } else {
        let mut cut: String = content.chars().take(budget).collect();
        cut.push_str(TRUNCATION_MARKER);
        cut
    }
}

/// Render the digest input: per source, the most recent `window_size`
/// records as `- Title: … / - Content: …` blocks in stored order.
/// Returns `None` when every store is empty: the caller exits early
/// rather than asking the LLM to summarize nothing.
pub fn build_digest(sources: &[DigestSource], limits: &DigestLimits) -> Option<String> {
    let mut rendered = String::new();
    let mut any = false;

    for source in sources {
        let records = source.store.load_recent(limits.window_size);
        if records.is_empty() {
            continue;
        }
        any = true;

        rendered.push_str(&format!("[{}]\n", source.label));
        for record in &records {
            let content = truncate_content(&record.content, limits.content_char_budget);
            rendered.push_str(&format!("- Title: {}\n- Content: {}\n", record.title, content));
        }
        rendered.push('\n');
    }

    if any {
        Some(rendered)
    } else {
        None
    }
}

/// Wrap the rendered records in the analyst framing used for the
/// daily market report.
pub fn build_prompt(digest_body: &str) -> String {
    format!(
        "You are a veteran global fund manager and market analyst with 20 years of experience.\n\
         Based on the latest financial news below, write today's market trend report as a\n\
         briefing for your colleagues.\n\n\
         Guidelines:\n\
         1. Market sentiment: score it 0-100 (0 = fear, 100 = euphoria) with a one-line verdict.\n\
         2. Top 3 trends: summarize the three most important stories of the day.\n\
         3. Sectors and names to watch: call out anything rallying or in the news.\n\
         4. Risk factors: mention anything worth worrying about.\n\
         5. Tone: professional but easy to read; use Markdown.\n\n\
         ---\n{}---\n",
        digest_body
    )
}

/// Run the digest end to end. Every failure path degrades: no data or
/// no provider produces a log line and a clean exit, a generation
/// failure still notifies with a placeholder message.
pub async fn run_digest(
    sources: &[DigestSource],
    limits: &DigestLimits,
    provider: Option<Arc<dyn LlmProvider>>,
    notifier: &WebhookNotifier,
) -> Result<()> {
    let digest_body = match build_digest(sources, limits) {
        Some(body) => body,
        None => {
            info!("no news data found to analyze");
            return Ok(());
        }
    };

    let provider = match provider {
        Some(p) => p,
        None => {
            info!("no LLM provider configured, skipping analysis");
            return Ok(());
        }
    };

    let request = LlmRequest {
        prompt: build_prompt(&digest_body),
        max_tokens: Some(limits.max_tokens),
        temperature: Some(0.7),
        timeout_seconds: None,
    };

    let message = match provider.generate(request).await {
        Ok(response) => {
            info!(
                model = %response.model,
                tokens = response.usage.total_tokens,
                "analysis generated"
            );
            response.content
        }
        Err(e) => {
            error!(error = %e, "LLM analysis failed");
            format!("Analysis failed: {}", e)
        }
    };

    notifier.send(&message).await;
    Ok(())
}
