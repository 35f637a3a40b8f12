//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Reject malformed trusted proxy CIDRs before any request is served
//! - Validate value ranges (timeouts > 0, source timeouts inside the budget)
//! - Validate addresses, URLs and header names
//!
//! Returns all validation errors, not just the first.

use std::fmt;
use std::net::SocketAddr;

use axum::http::HeaderName;

use crate::config::schema::ServiceConfig;
use crate::net::TrustedProxySet;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a loaded configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("{:?} is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.request_timeout_secs == 0 {
        errors.push(ValidationError::new("listener.request_timeout_secs", "must be > 0"));
    }

    if let Err(e) = TrustedProxySet::parse(&config.trust.trusted_proxies) {
        errors.push(ValidationError::new("trust.trusted_proxies", e.to_string()));
    }
    for (field, name) in [
        ("trust.cdn_header", &config.trust.cdn_header),
        ("trust.real_ip_header", &config.trust.real_ip_header),
    ] {
        if HeaderName::from_bytes(name.trim().as_bytes()).is_err() {
            errors.push(ValidationError::new(field, format!("{:?} is not a header name", name)));
        }
    }

    let budget_ms = config.enrichment.budget_ms;
    if budget_ms == 0 {
        errors.push(ValidationError::new("enrichment.budget_ms", "must be > 0"));
    }

    if config.geoip.lookup_timeout_ms == 0 {
        errors.push(ValidationError::new("geoip.lookup_timeout_ms", "must be > 0"));
    } else if config.geoip.lookup_timeout_ms >= budget_ms {
        errors.push(ValidationError::new(
            "geoip.lookup_timeout_ms",
            "must be shorter than enrichment.budget_ms",
        ));
    }
    if config.geoip.asn_database.trim().is_empty() {
        errors.push(ValidationError::new("geoip.asn_database", "must not be empty"));
    }
    if config.geoip.city_database.trim().is_empty() {
        errors.push(ValidationError::new("geoip.city_database", "must not be empty"));
    }

    if config.reputation.is_active() {
        if config.reputation.timeout_ms == 0 {
            errors.push(ValidationError::new("reputation.timeout_ms", "must be > 0"));
        } else if config.reputation.timeout_ms >= budget_ms {
            errors.push(ValidationError::new(
                "reputation.timeout_ms",
                "must be shorter than enrichment.budget_ms",
            ));
        }
        if let Err(e) = url::Url::parse(&config.reputation.base_url) {
            errors.push(ValidationError::new("reputation.base_url", e.to_string()));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("{:?} is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
