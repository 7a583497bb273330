use anyhow::{Context, Result};
use reqwest::Client;
use std::time::Duration;

/// Browser-like UA used unless the configuration overrides it. Yahoo
/// Finance rejects obvious bot user agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Build the HTTP client shared by one job invocation.
pub fn build_client(user_agent: Option<&str>, timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(user_agent.unwrap_or(DEFAULT_USER_AGENT))
        .build()
        .context("failed to build reqwest client")
}

/// Fetch a page and return its body as text. A non-success status is an
/// error; callers decide whether it aborts a listing or just degrades
/// one article.
pub async fn fetch_page(client: &Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .header(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        )
        .header("Accept-Language", "en-US,en;q=0.9")
        .send()
        .await
        .with_context(|| format!("failed to fetch {}", url))?;

    let status = response.status();
    if !status.is_success() {
        anyhow::bail!("fetch of {} failed with status: {}", url, status);
    }

    response
        .text()
        .await
        .with_context(|| format!("failed to read body of {}", url))
}
