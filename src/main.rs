//! Playlist forwarding proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────┐
//!                        │                 FORWARDING PROXY                 │
//!                        │                                                  │
//!   Renderer request     │  ┌──────────┐   ┌──────────┐   ┌──────────────┐  │
//!   ─────────────────────┼─▶│   net    │──▶│  http    │──▶│   routing    │  │
//!   127.0.0.1:<port>/... │  │ listener │   │  server  │   │   target     │  │
//!                        │  └────┬─────┘   └──────────┘   └──────┬───────┘  │
//!                        │       │ port                          │          │
//!                        │       ▼                               ▼          │
//!                        │  ┌──────────┐                  ┌──────────────┐  │
//!                        │  │ registry │                  │   upstream   │──┼──▶ Origin
//!                        │  └──────────┘                  │    client    │  │
//!                        │                                └──────┬───────┘  │
//!   Relayed response     │  ┌──────────────────────┐             │          │
//!   ◀────────────────────┼──│ http::response relay │◀────────────┘          │
//!                        │  │ + http::headers      │                        │
//!                        │  └──────────────────────┘                        │
//!                        └──────────────────────────────────────────────────┘
//! ```

use std::error::Error;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use playlist_proxy::config::{load_config, ProxyConfig};
use playlist_proxy::lifecycle::{shutdown, start};
use playlist_proxy::observability::{logging, metrics};
use playlist_proxy::upstream::UpstreamClient;
use playlist_proxy::PortRegistry;

#[derive(Parser)]
#[command(name = "playlist-proxy")]
#[command(about = "Loopback forwarding proxy for cross-origin playlist playback", long_about = None)]
struct Cli {
    /// Optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the playlist text of each URL instead of serving
    #[arg(long)]
    fetch: bool,

    /// Upstream URLs to print proxy URLs for once the listener is bound
    urls: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    logging::init(&config.observability.log_level);

    tracing::info!("playlist-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    if cli.fetch {
        let client = UpstreamClient::new(&config.upstream);
        for url in &cli.urls {
            print!("{}", client.fetch_playlist(url).await?);
        }
        return Ok(());
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics endpoint");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let (publisher, registry) = PortRegistry::new();
    let handle = start(&config, publisher).await?;

    for url in &cli.urls {
        println!("{}", registry.issue_proxy_url(url).await?);
    }

    shutdown::ctrl_c().await;

    if !handle.shutdown(Duration::from_secs(5)).await {
        tracing::warn!("Exiting with relays still open");
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
