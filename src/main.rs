//! ipquery server.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────────────┐
//!                  │                         IPQUERY                          │
//!                  │                                                          │
//!   Request        │  ┌─────────┐    ┌──────────────┐    ┌────────────────┐   │
//!   ───────────────┼─▶│  http   │───▶│   resolver   │───▶│     enrich     │   │
//!   (peer+headers) │  │ server  │    │ trust bound. │    │    pipeline    │   │
//!                  │  └─────────┘    └──────────────┘    └───────┬────────┘   │
//!                  │                                    ┌────────┼────────┐   │
//!                  │                                    ▼        ▼        ▼   │
//!                  │                                  asn      city  reputation│
//!                  │                                 (mmdb)   (mmdb)  (https) │
//!   Response       │                                                          │
//!   ◀──────────────┼── JSON ResultAggregate                                   │
//!                  │                                                          │
//!                  │  config · observability · lifecycle                      │
//!                  └──────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use ipquery::config::{load_config, load_from_env};
use ipquery::http::{AppState, HttpServer};
use ipquery::lifecycle::{build_service, start_watcher, Shutdown};
use ipquery::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "ipquery")]
#[command(about = "Client IP resolution and enrichment service", long_about = None)]
struct Args {
    /// TOML configuration file. Without it, defaults plus environment are used.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path),
        None => load_from_env(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("ipquery: {e}");
            std::process::exit(2);
        }
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "ipquery starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.listener.request_timeout_secs,
        budget_ms = config.enrichment.budget_ms,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let service = build_service(&config)?;
    let _watcher = start_watcher(&config, &service.databases)?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(
        AppState::new(service.lookup),
        Duration::from_secs(config.listener.request_timeout_secs),
    );
    let serving = server.run(listener, shutdown.subscribe());

    tokio::pin!(serving);
    tokio::select! {
        result = &mut serving => result?,
        _ = shutdown.trigger_on_signal() => serving.await?,
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
