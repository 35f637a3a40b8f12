//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Trusted proxy ranges, comma-separated.
pub const ENV_TRUSTED_PROXY_CIDRS: &str = "TRUSTED_PROXY_CIDRS";
pub const ENV_LISTEN_ADDR: &str = "LISTEN_ADDR";
pub const ENV_GEOLITE2_ASN: &str = "GEOLITE2_ASN";
pub const ENV_GEOLITE2_CITY: &str = "GEOLITE2_CITY";
pub const ENV_ABUSEIPDB_API_KEY: &str = "ABUSEIPDB_API_KEY";

/// Error type for configuration problems. All of these are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),

    #[error("bad cidr {entry:?}: {reason}")]
    InvalidCidr { entry: String, reason: String },

    #[error("enrichers {first} and {second} both write the {section} section")]
    OverlappingSections {
        section: &'static str,
        first: &'static str,
        second: &'static str,
    },

    #[error("timeout of enricher {stage} ({timeout_ms}ms) must be shorter than the enrichment budget ({budget_ms}ms)")]
    StageTimeoutExceedsBudget {
        stage: &'static str,
        timeout_ms: u128,
        budget_ms: u128,
    },
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration from a TOML file, apply environment overrides and validate.
pub fn load_config(path: &Path) -> Result<ServiceConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let mut config: ServiceConfig = toml::from_str(&content)?;

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Build configuration from defaults plus environment overrides only.
pub fn load_from_env() -> Result<ServiceConfig, ConfigError> {
    let mut config = ServiceConfig::default();
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Overlay environment variables on top of file values.
///
/// `lookup` is injected so tests never touch the process environment.
pub fn apply_env_overrides<F>(config: &mut ServiceConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(cidrs) = lookup(ENV_TRUSTED_PROXY_CIDRS) {
        config.trust.trusted_proxies = cidrs
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
    }
    if let Some(addr) = lookup(ENV_LISTEN_ADDR) {
        config.listener.bind_address = listen_address(&addr);
    }
    if let Some(path) = lookup(ENV_GEOLITE2_ASN) {
        config.geoip.asn_database = path;
    }
    if let Some(path) = lookup(ENV_GEOLITE2_CITY) {
        config.geoip.city_database = path;
    }
    if let Some(key) = lookup(ENV_ABUSEIPDB_API_KEY) {
        config.reputation.api_key = key;
        config.reputation.enabled = true;
    }
}

// ":8080" is accepted for compatibility with older deployments.
fn listen_address(raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with(':') {
        format!("0.0.0.0{}", raw)
    } else {
        raw.to_string()
    }
}
