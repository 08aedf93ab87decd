//! Indicator feed server and one-shot resolver.
//!
//! # Architecture Overview
//!
//! ```text
//!   GET /api/indicators ──► http ──► Aggregator ──► MetricResolver (per key, concurrent)
//!                                                      │
//!                               ┌──────────────────────┼───────────────────────┐
//!                               ▼                      ▼                       ▼
//!                        FallbackResolver      TimeSeriesAligner     StalenessBoundedCache
//!                               │
//!                               ▼
//!                 providers (FRED, Twelve Data, FMP, CSV) ──► HttpFetcher ──► upstreams
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use indicator_feed::clock::SystemClock;
use indicator_feed::config::{load_or_default, EnvCredentials};
use indicator_feed::observability::{logging, metrics};
use indicator_feed::providers::FetchContext;
use indicator_feed::{Aggregator, HttpServer};

#[derive(Parser)]
#[command(name = "indicator-feed")]
#[command(about = "Resilient multi-source financial indicator feed", long_about = None)]
struct Cli {
    /// TOML configuration file; the built-in dashboard is used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the dashboard API (default)
    Serve,
    /// Resolve metrics once and print the JSON map
    Resolve {
        /// Metric keys; all configured metrics when empty
        keys: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_or_default(cli.config.as_deref())?;

    logging::init_tracing(&config.observability.log_level);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        metrics = config.metrics.len(),
        attempt_timeout_secs = config.timeouts.attempt_secs,
        "indicator-feed starting"
    );

    let ctx = FetchContext::from_config(
        &config,
        Arc::new(EnvCredentials::new(config.credentials.clone())),
        Arc::new(SystemClock),
    )?;
    let aggregator = Arc::new(Aggregator::from_config(&config, ctx));

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => {
            if config.observability.metrics_enabled {
                match config.observability.metrics_address.parse() {
                    Ok(addr) => metrics::init_metrics(addr),
                    Err(_) => tracing::error!(
                        metrics_address = %config.observability.metrics_address,
                        "Failed to parse metrics address"
                    ),
                }
            }

            let listener = TcpListener::bind(&config.server.bind_address).await?;
            let local_addr = listener.local_addr()?;
            tracing::info!(address = %local_addr, "Listening for connections");

            HttpServer::new(&config.server, aggregator).run(listener).await?;
        }
        Commands::Resolve { keys } => {
            let outcomes = if keys.is_empty() {
                aggregator.resolve_everything().await
            } else {
                aggregator.resolve_all(keys).await
            };
            println!("{}", serde_json::to_string_pretty(&outcomes)?);
        }
    }

    Ok(())
}
