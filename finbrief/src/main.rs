/*
finbrief - crawl + digest batch jobs over financial news sites.
Each invocation runs one job to completion and exits; scheduling is
left to cron or CI. Partial failures are logged, never fatal.
*/

use anyhow::Result;
use clap::{Parser, Subcommand};
use common::{Config, Secrets};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use finbrief::crawl::{self, CrawlLimits};
use finbrief::digest::{self, DigestLimits, DigestSource};
use finbrief::fetch;
use finbrief::llm::remote::RemoteLlmProvider;
use finbrief::llm::LlmProvider;
use finbrief::notify::WebhookNotifier;
use finbrief::sources;
use finbrief::store::LinkStore;

#[derive(Parser, Debug)]
#[command(name = "finbrief", about = "Financial news crawler and LLM digest")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl one source ("naver", "yahoo") or "all"
    Crawl {
        /// Source name, or "all" for every built-in source
        source: String,
    },
    /// Summarize recent records from every store and notify
    Digest,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    // Resolve config paths: packaged defaults plus an optional override
    let default_path = PathBuf::from("config.default.toml");
    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            error!(path = ?p, "specified config file not found");
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() {
            Some(p)
        } else {
            None
        }
    };

    let config = Config::load_with_defaults(
        if default_path.exists() {
            Some(&default_path)
        } else {
            None
        },
        override_path.as_deref(),
    )
    .await?;
    info!(default = ?default_path, override = ?override_path, "configuration loaded");

    // Secrets resolved once here and passed down; jobs never read the
    // environment themselves.
    let secrets = Secrets::from_env(&config);

    match args.command {
        Command::Crawl { source } => run_crawl_command(&config, &source).await,
        Command::Digest => run_digest_command(&config, &secrets).await,
    }
}

async fn run_crawl_command(config: &Config, source_name: &str) -> Result<()> {
    let specs = if source_name == "all" {
        sources::all_sources()
    } else {
        match sources::by_name(source_name) {
            Some(spec) => vec![spec],
            None => {
                let known: Vec<String> = sources::all_sources()
                    .into_iter()
                    .map(|s| s.name)
                    .collect();
                anyhow::bail!("unknown source {:?}; known sources: {:?}", source_name, known);
            }
        }
    };

    let crawl_cfg = &config.crawl;
    let client = fetch::build_client(
        crawl_cfg.user_agent.as_deref(),
        crawl_cfg.fetch_timeout_seconds.unwrap_or(10),
    )?;

    let limits = CrawlLimits {
        per_run_cap: crawl_cfg.per_run_cap.unwrap_or(10),
        article_delay: Duration::from_secs(crawl_cfg.delay_seconds.unwrap_or(1)),
        noise_floor: crawl_cfg.noise_floor.unwrap_or(50),
        utc_offset_hours: crawl_cfg.utc_offset_hours.unwrap_or(9),
    };
    let data_dir = Path::new(&crawl_cfg.data_dir);

    // One source failing must not stop the others.
    for spec in &specs {
        let store = LinkStore::new(spec.store_path(data_dir), spec.schema);
        match crawl::run_crawl(&client, spec, &store, &limits).await {
            Ok(written) => info!(source = %spec.name, written, "crawl finished"),
            Err(e) => error!(source = %spec.name, error = %e, "crawl failed"),
        }
    }

    Ok(())
}

async fn run_digest_command(config: &Config, secrets: &Secrets) -> Result<()> {
    let data_dir = Path::new(&config.crawl.data_dir);

    let digest_sources: Vec<DigestSource> = sources::all_sources()
        .into_iter()
        .map(|spec| DigestSource {
            label: format!("{} ({})", spec.category, spec.name),
            store: LinkStore::new(spec.store_path(data_dir), spec.schema),
        })
        .collect();

    let digest_cfg = config.digest.clone().unwrap_or(common::DigestConfig {
        window_size: None,
        content_char_budget: None,
    });
    let mut limits = DigestLimits {
        window_size: digest_cfg.window_size.unwrap_or(15),
        content_char_budget: digest_cfg.content_char_budget.unwrap_or(500),
        ..DigestLimits::default()
    };

    let provider: Option<Arc<dyn LlmProvider>> = match (&config.llm, &secrets.llm_api_key) {
        (Some(llm_cfg), Some(api_key)) => {
            let api_url = llm_cfg
                .api_url
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1/chat/completions".to_string());
            let model = llm_cfg
                .model
                .clone()
                .unwrap_or_else(|| "gpt-4o-mini".to_string());
            limits.max_tokens = llm_cfg.max_tokens.unwrap_or(limits.max_tokens);
            let provider = RemoteLlmProvider::new(api_url, api_key.clone(), model).with_defaults(
                llm_cfg.timeout_seconds.unwrap_or(60),
                limits.max_tokens,
                0.7,
            );
            Some(Arc::new(provider) as Arc<dyn LlmProvider>)
        }
        _ => None,
    };

    let notifier = WebhookNotifier::new(reqwest::Client::new(), secrets.webhook_url.clone());

    digest::run_digest(&digest_sources, &limits, provider, &notifier).await
}
