//! Diagnostic CLI for ipquery.
//!
//! `resolve` and `lookup` run the library in-process against the local
//! configuration; `remote` asks a running server.

use std::path::PathBuf;

use axum::http::{HeaderMap, HeaderName, HeaderValue};
use clap::{Parser, Subcommand};
use serde_json::Value;

use ipquery::config::{load_config, load_from_env, ServiceConfig};
use ipquery::lifecycle::build_service;
use ipquery::resolver::TrustBoundaryResolver;

#[derive(Parser)]
#[command(name = "ipquery-cli")]
#[command(about = "Diagnostic CLI for the ipquery service", long_about = None)]
struct Cli {
    /// TOML configuration file. Without it, defaults plus environment are used.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which address a request would resolve to, and why
    Resolve {
        /// Direct TCP peer, e.g. `10.0.0.1:52311` or `[::1]:8080`
        #[arg(long)]
        peer: String,
        /// Request header as `Name: value`; repeatable
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },
    /// Enrich an address using the local databases
    Lookup { ip: String },
    /// Ask a running server to enrich an address
    Remote {
        #[arg(short, long, default_value = "http://localhost:8080")]
        url: String,
        ip: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve { peer, headers } => {
            let config = config(&cli.config)?;
            let resolver = TrustBoundaryResolver::from_config(&config.trust)?;
            let headers = parse_headers(&headers)?;
            let resolution = resolver.resolve_with_source(&peer, &headers)?;
            println!("{} (from {})", resolution.address, resolution.source);
        }
        Commands::Lookup { ip } => {
            let config = config(&cli.config)?;
            let service = build_service(&config)?;
            let result = service.lookup.lookup(&ip).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Remote { url, ip } => {
            let res = reqwest::Client::new()
                .get(format!("{}/lookup/{}", url.trim_end_matches('/'), ip))
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

fn config(path: &Option<PathBuf>) -> Result<ServiceConfig, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(path) => load_config(path)?,
        None => load_from_env()?,
    })
}

fn parse_headers(raw: &[String]) -> Result<HeaderMap, Box<dyn std::error::Error>> {
    let mut headers = HeaderMap::new();
    for line in raw {
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| format!("header {line:?} is not `Name: value`"))?;
        headers.append(
            HeaderName::from_bytes(name.trim().as_bytes())?,
            HeaderValue::from_str(value.trim())?,
        );
    }
    Ok(headers)
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    if !status.is_success() {
        eprintln!("Error: server returned status {status}: {}", text.trim());
        std::process::exit(1);
    }

    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{text}"),
    }
    Ok(())
}
