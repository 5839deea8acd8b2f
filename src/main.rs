//! Route engine server.
//!
//! Serves a TOML-configured route table over HTTP.
//!
//! ```text
//!     Client Request
//!     ──────────────▶ axum fallback ──▶ Router::match_compiled(method, path)
//!                                          │
//!                      ┌───────────────────┼────────────────────┐
//!                      ▼                   ▼                    ▼
//!                 route handler      OPTIONS (Allow)      404 / 405 (Allow)
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use route_engine::config::{load_config, EngineConfig};
use route_engine::http::HttpServer;
use route_engine::lifecycle::startup::build_router;
use route_engine::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "route-engine")]
#[command(about = "Serve a configured route table", long_about = None)]
struct Args {
    /// Route table (TOML). Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bind address from the config file.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.server.bind_address = bind;
    }

    logging::init_logging(&config.logging).map_err(|e| e as Box<dyn std::error::Error>)?;

    tracing::info!(
        bind_address = %config.server.bind_address,
        routes = config.routes.len(),
        cache = ?config.cache.backend,
        "Configuration loaded"
    );

    if config.server.metrics_enabled {
        match config.server.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.server.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let router = build_router(&config)?;

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    HttpServer::new(router).run(listener).await?;
    Ok(())
}
