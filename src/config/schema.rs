//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the service.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the lookup service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address, request timeout).
    pub listener: ListenerConfig,

    /// Trust boundary for forwarded client addresses.
    pub trust: TrustConfig,

    /// MaxMind GeoLite2 database settings.
    pub geoip: GeoIpConfig,

    /// AbuseIPDB reputation lookups.
    pub reputation: ReputationConfig,

    /// Enrichment pipeline limits.
    pub enrichment: EnrichmentConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Upper bound on a whole HTTP request, in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 10,
        }
    }
}

/// Which peers may assert the client address through headers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TrustConfig {
    /// CIDR ranges of trusted reverse proxies.
    pub trusted_proxies: Vec<String>,

    /// Single-value header set by the CDN edge.
    pub cdn_header: String,

    /// Single-value header set by the reverse proxy.
    pub real_ip_header: String,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            trusted_proxies: vec!["127.0.0.1/32".to_string(), "::1/128".to_string()],
            cdn_header: "cf-connecting-ip".to_string(),
            real_ip_header: "x-real-ip".to_string(),
        }
    }
}

/// GeoLite2 database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeoIpConfig {
    /// Path to the GeoLite2-ASN database.
    pub asn_database: String,

    /// Path to the GeoLite2-City database.
    pub city_database: String,

    /// Per-lookup timeout in milliseconds.
    pub lookup_timeout_ms: u64,

    /// Reload databases when the files change on disk.
    pub watch: bool,
}

impl Default for GeoIpConfig {
    fn default() -> Self {
        Self {
            asn_database: "./geolite/GeoLite2-ASN.mmdb".to_string(),
            city_database: "./geolite/GeoLite2-City.mmdb".to_string(),
            lookup_timeout_ms: 250,
            watch: false,
        }
    }
}

/// AbuseIPDB configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReputationConfig {
    /// Enable reputation lookups (also requires an API key).
    pub enabled: bool,

    /// AbuseIPDB API key.
    pub api_key: String,

    /// API base URL.
    pub base_url: String,

    /// HTTP timeout in milliseconds.
    pub timeout_ms: u64,

    /// Only consider reports newer than this many days.
    pub max_age_days: u32,
}

impl ReputationConfig {
    /// Reputation lookups run only when enabled and a key is present.
    pub fn is_active(&self) -> bool {
        self.enabled && !self.api_key.trim().is_empty()
    }
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            base_url: "https://api.abuseipdb.com".to_string(),
            timeout_ms: 500,
            max_age_days: 90,
        }
    }
}

/// Enrichment pipeline configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EnrichmentConfig {
    /// Total time allowed for one enrichment, in milliseconds.
    /// Every source timeout must be shorter than this.
    pub budget_ms: u64,
}

impl Default for EnrichmentConfig {
    fn default() -> Self {
        Self { budget_ms: 2000 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
