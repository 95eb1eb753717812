//! # Trendscout CLI (`trends`)
//!
//! The `trends` binary is the primary interface for Trendscout. It provides
//! commands for database initialization, trend searches, platform status,
//! query history, trending keywords, and the HTTP API server.
//!
//! ## Usage
//!
//! ```bash
//! trends --config ./config/trends.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `trends init` | Create the SQLite database and run schema migrations |
//! | `trends search "<keyword>"` | Run a trend search |
//! | `trends platforms` | List platform adapters and their availability |
//! | `trends history` | Show recent trend queries |
//! | `trends trending` | Show most-queried keywords in a window |
//! | `trends serve` | Start the HTTP API server |

mod config;
mod connector_reddit;
mod connector_twitter;
mod connector_youtube;
mod db;
mod embedding;
mod ingest;
mod migrate;
mod models;
mod momentum;
mod search;
mod server;
mod store;
mod traits;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::models::{Timeframe, TrendSearchRequest, MAX_LIMIT};
use crate::search::TrendEngine;
use crate::traits::PlatformRegistry;

/// Trendscout — discover and rank recently-published content about a
/// keyword across reddit, youtube, and twitter.
#[derive(Parser)]
#[command(name = "trends", version)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, global = true, default_value = "config/trends.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the database and run schema migrations
    Init,
    /// Run a trend search
    Search {
        /// The keyword to search for
        keyword: String,
        /// Comma-separated platforms (reddit, youtube, twitter; "x" is accepted)
        #[arg(long)]
        platforms: Option<String>,
        /// Lookback window: 1h, 24h, 7d, 30d, 1y, or all
        #[arg(long, default_value = "all")]
        timeframe: String,
        /// Maximum number of results
        #[arg(long)]
        limit: Option<usize>,
        /// Language hint passed to the platforms
        #[arg(long)]
        lang: Option<String>,
        /// Region hint passed to the platforms
        #[arg(long)]
        region: Option<String>,
        /// Requester reference recorded with the query
        #[arg(long)]
        requester: Option<String>,
    },
    /// List platform adapters and their availability
    Platforms,
    /// Show recent trend queries
    History {
        #[arg(long)]
        requester: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show the most-queried keywords over a recent window
    Trending {
        /// Window token: 1h, 24h, 7d, 30d, 1y, or all
        #[arg(long, default_value = "24h")]
        window: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Start the HTTP API server
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trendscout=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = config::load_config(&cli.config)?;

    match cli.command {
        Command::Init => {
            let pool = db::connect(&config).await?;
            migrate::run_migrations(&pool).await?;
            pool.close().await;
            println!("database initialized at {}", config.db.path.display());
        }
        Command::Search {
            keyword,
            platforms,
            timeframe,
            limit,
            lang,
            region,
            requester,
        } => {
            if keyword.trim().is_empty() {
                anyhow::bail!("keyword must not be empty");
            }

            let pool = db::connect(&config).await?;
            let engine = build_engine(&config, pool.clone())?;

            let request = TrendSearchRequest {
                keyword,
                platforms: platforms
                    .map(|p| p.split(',').map(|s| s.trim().to_string()).collect())
                    .unwrap_or_default(),
                timeframe,
                lang,
                region,
                limit: limit.map(|l| l.clamp(1, MAX_LIMIT)),
                requester,
            };

            let response = engine.search(&request).await?;

            println!(
                "{} results for \"{}\" across {:?}",
                response.total_results, response.keyword, response.platforms
            );
            for (i, item) in response.results.iter().enumerate() {
                let title = item.title.as_deref().unwrap_or("(untitled)");
                println!(
                    "{}. [{:.2}] {} / {} by {}",
                    i + 1,
                    item.momentum.unwrap_or(0.0),
                    item.platform,
                    title,
                    item.author
                );
                println!("    published: {}", item.published_at.format("%Y-%m-%d %H:%M"));
                println!("    url: {}", item.url);
            }

            // Give the background persistence task a moment before the
            // process exits; it is best-effort either way.
            tokio::time::sleep(std::time::Duration::from_millis(500)).await;
            pool.close().await;
        }
        Command::Platforms => {
            let registry = PlatformRegistry::from_config(&config);
            for adapter in registry.adapters() {
                let status = if adapter.is_available() {
                    "available"
                } else {
                    "unavailable (no credentials)"
                };
                println!("{:<10} {}", adapter.platform().to_string(), status);
            }
        }
        Command::History { requester, limit } => {
            let pool = db::connect(&config).await?;
            let queries =
                store::trend_history(&pool, requester.as_deref(), limit.clamp(1, MAX_LIMIT))
                    .await?;
            for q in &queries {
                println!(
                    "{}  \"{}\"  platforms={:?}  timeframe={}",
                    q.created_at.format("%Y-%m-%d %H:%M"),
                    q.keyword,
                    q.platforms,
                    q.timeframe
                );
            }
            pool.close().await;
        }
        Command::Trending { window, limit } => {
            let pool = db::connect(&config).await?;
            let timeframe = Timeframe::parse(&window);
            let top = store::top_keywords_in_window(
                &pool,
                server::window_duration(timeframe),
                limit.clamp(1, MAX_LIMIT),
            )
            .await?;
            for (i, (keyword, count)) in top.iter().enumerate() {
                println!("{}. {} ({} queries)", i + 1, keyword, count);
            }
            pool.close().await;
        }
        Command::Serve => {
            let pool = db::connect(&config).await?;
            migrate::run_migrations(&pool).await?;
            let engine = build_engine(&config, pool.clone())?;
            server::run_server(&config, engine, pool).await?;
        }
    }

    Ok(())
}

fn build_engine(config: &config::Config, pool: sqlx::SqlitePool) -> anyhow::Result<Arc<TrendEngine>> {
    let registry = Arc::new(PlatformRegistry::from_config(config));
    let embedder: Arc<dyn embedding::Embedder> =
        Arc::from(embedding::create_embedder(&config.embedding)?);
    Ok(Arc::new(TrendEngine::new(
        pool,
        registry,
        embedder,
        config.retrieval.clone(),
    )))
}
