/*!
common/src/lib.rs

Shared configuration types for Finbrief.

This file provides:
- Config data structures (deserialized from TOML)
- An async loader for a TOML config file, with default + override merging
- Resolution of secret values (API key, webhook URL) from the environment
*/

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::warn;

/// Crawling / politeness configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Directory holding the per-source CSV store files (e.g. "data")
    pub data_dir: String,
    /// User-Agent sent on every fetch. Yahoo in particular bot-detects
    /// default client UAs, so this should look like a browser.
    pub user_agent: Option<String>,
    pub fetch_timeout_seconds: Option<u64>,
    /// Fixed pause between consecutive article fetches, in seconds
    pub delay_seconds: Option<u64>,
    /// Maximum number of new articles fetched per run
    pub per_run_cap: Option<usize>,
    /// Minimum stripped paragraph length counted as article text
    pub noise_floor: Option<usize>,
    /// Fixed UTC offset (hours) used for captured-at timestamps
    pub utc_offset_hours: Option<i32>,
}

/// Digest window configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    /// Most-recent-N records taken from each store
    pub window_size: Option<usize>,
    /// Per-record content character budget before truncation
    pub content_char_budget: Option<usize>,
}

/// Remote LLM configuration (OpenAI-compatible chat completions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub api_url: Option<String>,
    /// Name of the environment variable holding the API key
    pub api_key_env: Option<String>,
    pub model: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub max_tokens: Option<usize>,
}

/// Webhook notifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    /// Name of the environment variable holding the webhook URL
    pub webhook_url_env: Option<String>,
}

/// Top-level application configuration (deserialized from config.toml)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub crawl: CrawlConfig,
    pub digest: Option<DigestConfig>,
    pub llm: Option<LlmConfig>,
    pub notifier: Option<NotifierConfig>,
}

impl Config {
    /// Load configuration from a TOML file asynchronously.
    pub async fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data = tokio::fs::read_to_string(path.as_ref())
            .await
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;
        let cfg: Config = toml::from_str(&data).context("Failed to parse TOML configuration")?;
        Ok(cfg)
    }

    /// Load configuration with an optional default file and an optional override file.
    /// If both are present, they are merged (override takes precedence).
    pub async fn load_with_defaults(
        default_path: Option<&Path>,
        override_path: Option<&Path>,
    ) -> Result<Self> {
        let mut config_value = toml::Value::Table(toml::map::Map::new());

        if let Some(path) = default_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read default config: {}", path.display()))?;
                let val: toml::Value =
                    toml::from_str(&data).context("Failed to parse default configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        if let Some(path) = override_path {
            if path.exists() {
                let data = tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read override config: {}", path.display()))?;
                let val: toml::Value =
                    toml::from_str(&data).context("Failed to parse override configuration")?;
                merge_toml(&mut config_value, val);
            }
        }

        let cfg: Config = config_value
            .try_into()
            .context("Failed to parse merged configuration")?;
        Ok(cfg)
    }
}

fn merge_toml(a: &mut toml::Value, b: toml::Value) {
    match (a, b) {
        (toml::Value::Table(a_map), toml::Value::Table(b_map)) => {
            for (k, v) in b_map {
                if let Some(a_val) = a_map.get_mut(&k) {
                    merge_toml(a_val, v);
                } else {
                    a_map.insert(k, v);
                }
            }
        }
        (a_val, b_val) => *a_val = b_val,
    }
}

/// Secret values resolved once at process start and passed into jobs.
/// Absence of a secret degrades the feature that needs it; it never
/// aborts the run.
#[derive(Debug, Clone, Default)]
pub struct Secrets {
    pub llm_api_key: Option<String>,
    pub webhook_url: Option<String>,
}

impl Secrets {
    /// Resolve secrets from the environment using the variable names
    /// declared in the configuration. Missing variables are logged.
    pub fn from_env(config: &Config) -> Self {
        let llm_api_key = config
            .llm
            .as_ref()
            .and_then(|l| l.api_key_env.as_deref())
            .and_then(|name| match std::env::var(name) {
                Ok(v) if !v.is_empty() => Some(v),
                _ => {
                    warn!(var = name, "LLM API key env var not set; analysis will be skipped");
                    None
                }
            });

        let webhook_url = config
            .notifier
            .as_ref()
            .and_then(|n| n.webhook_url_env.as_deref())
            .and_then(|name| match std::env::var(name) {
                Ok(v) if !v.is_empty() => Some(v),
                _ => {
                    warn!(var = name, "webhook URL env var not set; digest will print locally");
                    None
                }
            });

        Secrets {
            llm_api_key,
            webhook_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn config_from_string() {
        let toml = r#"
            [crawl]
            data_dir = "data"
            delay_seconds = 1
            per_run_cap = 10

            [digest]
            window_size = 15
            content_char_budget = 500

            [llm]
            api_url = "https://example.invalid/v1/chat/completions"
            api_key_env = "FINBRIEF_LLM_API_KEY"
            model = "gpt-4o-mini"
        "#;

        let cfg: Config = toml::from_str(toml).expect("parse config");
        assert_eq!(cfg.crawl.data_dir, "data");
        assert_eq!(cfg.crawl.per_run_cap, Some(10));
        assert_eq!(cfg.digest.as_ref().unwrap().window_size, Some(15));
        assert_eq!(
            cfg.llm.as_ref().unwrap().api_key_env.as_deref(),
            Some("FINBRIEF_LLM_API_KEY")
        );
        assert!(cfg.notifier.is_none());
    }

    #[tokio::test]
    async fn override_takes_precedence_over_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");

        let default_path = dir.path().join("config.default.toml");
        let mut f = std::fs::File::create(&default_path).expect("create default");
        writeln!(
            f,
            "[crawl]\ndata_dir = \"data\"\nper_run_cap = 10\ndelay_seconds = 1"
        )
        .unwrap();

        let override_path = dir.path().join("config.toml");
        let mut f = std::fs::File::create(&override_path).expect("create override");
        writeln!(f, "[crawl]\ndata_dir = \"data\"\nper_run_cap = 3").unwrap();

        let cfg = Config::load_with_defaults(Some(&default_path), Some(&override_path))
            .await
            .expect("load merged");

        // Overridden key wins, untouched key survives from defaults
        assert_eq!(cfg.crawl.per_run_cap, Some(3));
        assert_eq!(cfg.crawl.delay_seconds, Some(1));
    }

    #[test]
    fn missing_secret_env_degrades_to_none() {
        let toml = r#"
            [crawl]
            data_dir = "data"

            [llm]
            api_key_env = "FINBRIEF_TEST_KEY_THAT_IS_NOT_SET"

            [notifier]
            webhook_url_env = "FINBRIEF_TEST_WEBHOOK_THAT_IS_NOT_SET"
        "#;
        let cfg: Config = toml::from_str(toml).expect("parse config");

        let secrets = Secrets::from_env(&cfg);
        assert!(secrets.llm_api_key.is_none());
        assert!(secrets.webhook_url.is_none());
    }
}
