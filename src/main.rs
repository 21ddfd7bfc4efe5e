//! Media Proxy
//!
//! A forwarding proxy for media and feed hosts, built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌──────────────────────────────────────────────────────────┐
//!                          │                       MEDIA PROXY                         │
//!                          │                                                           │
//!     GET /api/proxy?url=  │  ┌─────────┐   ┌───────────┐   ┌──────────────────────┐  │
//!     ─────────────────────┼─▶│  http   │──▶│ validator │──▶│   header builder     │  │
//!                          │  │ server  │   │ allowlist │   │ + credential manager │  │
//!                          │  └─────────┘   └───────────┘   └──────────┬───────────┘  │
//!                          │                                           │              │
//!                          │                                           ▼              │
//!                          │                                  ┌────────────────┐      │
//!                          │                                  │  url rewriter  │      │
//!                          │                                  └───────┬────────┘      │
//!                          │                                          ▼               │
//!     raw bytes            │  ┌─────────┐   ┌────────────┐   ┌────────────────┐      │
//!     ◀────────────────────┼──│  http   │◀──│ translator │◀──│    upstream    │◀─────┼──── Media / API
//!                          │  │ server  │   │            │   │    fetcher     │      │     hosts
//!                          │  └─────────┘   └────────────┘   └────────────────┘      │
//!                          │                                                           │
//!                          │  config · observability · lifecycle · security           │
//!                          └──────────────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;

use media_proxy::config::load_config;
use media_proxy::observability::{logging, metrics};
use media_proxy::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "media-proxy")]
#[command(about = "Forwarding proxy for media and feed hosts", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. A missing file means defaults.
    #[arg(short, long, default_value = "media-proxy.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    logging::init(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "media-proxy starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        allowlist = ?config.allowlist.hosts,
        oauth = config.oauth.has_credentials(),
        password_gate = config.security.app_password.is_some(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config.observability.metrics_address.parse::<SocketAddr>()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    shutdown.trigger_on_signal();

    let server = HttpServer::from_config(config)?;
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
