//! Edge gateway (v1)
//!
//! An authenticating, rate-limiting HTTP gateway built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────────────────┐
//!                  │                         EDGE GATEWAY                          │
//!                  │                                                                │
//!   Client Request │  ┌─────────┐   ┌──────────┐   ┌─────────┐   ┌──────────────┐  │
//!   ───────────────┼─▶│  http   │──▶│   auth   │──▶│ routing │──▶│  rate limit  │  │
//!                  │  │ server  │   │whitelist/│   │ prefix  │   │ token bucket │  │
//!                  │  └─────────┘   │  token   │   │  table  │   └──────┬───────┘  │
//!                  │                └────┬─────┘   └────┬────┘          │          │
//!                  │                  403│          404 │      429 / ok │          │
//!                  │                     ▼              ▼               ▼          │
//!  Client Response │               ┌──────────────────────────┐  ┌────────────┐    │
//!   ◀──────────────┼───────────────│  response decorator      │◀─│  upstream  │◀───┼── Backend
//!                  │               │  (CORS headers)          │  │   client   │    │
//!                  │               └──────────────────────────┘  └────────────┘    │
//!                  └──────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use edge_gateway::config::load_config;
use edge_gateway::lifecycle::{signals, Shutdown};
use edge_gateway::observability::{logging, metrics};
use edge_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "edge-gateway")]
#[command(about = "Authenticating, rate-limiting HTTP edge gateway", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "gateway.toml")]
    config: PathBuf,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(&cli.config)?;
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind.to_string();
    }

    logging::init(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "edge-gateway starting"
    );
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        backend_timeout_secs = config.timeouts.backend_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    signals::spawn_signal_handler(&shutdown);

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
