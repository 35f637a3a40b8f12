//! Trust-boundary client address resolution.
//!
//! # Responsibilities
//! - Normalize the direct TCP peer
//! - Ignore every forwarding header unless the peer is a trusted proxy
//! - Walk the candidate headers in fixed precedence order
//!
//! # Precedence
//! ```text
//! peer untrusted  → peer
//! peer trusted    → CDN header → real-IP header → Forwarded → X-Forwarded-For → peer
//! ```

use std::net::{IpAddr, SocketAddr};

use axum::http::{HeaderMap, HeaderName};
use thiserror::Error;

use crate::config::{ConfigError, TrustConfig};
use crate::net::{normalize, parse_host_port, TrustedProxySet};
use crate::observability::metrics;
use crate::resolver::candidates::{self, CandidateSource};

/// Resolution failures. Only an unusable peer address is fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("peer address {peer:?} is not a network address")]
    NoAddress { peer: String },
}

/// The authoritative client address and the header it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub address: IpAddr,
    pub source: CandidateSource,
}

/// Resolves the client address for one request.
///
/// Built once at startup and shared read-only across requests.
#[derive(Debug, Clone)]
pub struct TrustBoundaryResolver {
    trusted: TrustedProxySet,
    cdn_header: HeaderName,
    real_ip_header: HeaderName,
}

impl TrustBoundaryResolver {
    /// Create a resolver with the default header names.
    pub fn new(trusted: TrustedProxySet) -> Self {
        Self {
            trusted,
            cdn_header: HeaderName::from_static("cf-connecting-ip"),
            real_ip_header: HeaderName::from_static("x-real-ip"),
        }
    }

    /// Build a resolver from the trust section of the configuration.
    pub fn from_config(config: &TrustConfig) -> Result<Self, ConfigError> {
        let trusted = TrustedProxySet::parse(&config.trusted_proxies)?;
        let cdn_header = header_name("trust.cdn_header", &config.cdn_header)?;
        let real_ip_header = header_name("trust.real_ip_header", &config.real_ip_header)?;
        Ok(Self {
            trusted,
            cdn_header,
            real_ip_header,
        })
    }

    /// Override the CDN and real-IP header names.
    pub fn with_headers(mut self, cdn_header: HeaderName, real_ip_header: HeaderName) -> Self {
        self.cdn_header = cdn_header;
        self.real_ip_header = real_ip_header;
        self
    }

    pub fn trusted(&self) -> &TrustedProxySet {
        &self.trusted
    }

    /// Resolve the client address from a textual peer (`ip`, `ip:port`, `[v6]:port`).
    pub fn resolve(&self, direct_peer: &str, headers: &HeaderMap) -> Result<IpAddr, ResolutionError> {
        self.resolve_with_source(direct_peer, headers)
            .map(|r| r.address)
    }

    /// Like [`resolve`](Self::resolve), also reporting which source won.
    pub fn resolve_with_source(
        &self,
        direct_peer: &str,
        headers: &HeaderMap,
    ) -> Result<Resolution, ResolutionError> {
        let peer = parse_host_port(direct_peer).ok_or_else(|| ResolutionError::NoAddress {
            peer: direct_peer.to_string(),
        })?;
        Ok(self.resolve_ip(peer, headers))
    }

    /// Resolve for an already-typed socket peer; this cannot fail.
    pub fn resolve_peer(&self, peer: SocketAddr, headers: &HeaderMap) -> Resolution {
        self.resolve_ip(peer.ip(), headers)
    }

    fn resolve_ip(&self, peer: IpAddr, headers: &HeaderMap) -> Resolution {
        let peer = normalize(peer);

        if !self.trusted.contains(peer) {
            if candidates::has_forwarding_headers(headers, &self.cdn_header, &self.real_ip_header) {
                tracing::debug!(peer = %peer, "Ignoring forwarding headers from untrusted peer");
                metrics::record_untrusted_forwarding();
            }
            return self.finish(peer, CandidateSource::DirectPeer);
        }

        let found = candidates::single_value(headers, &self.cdn_header)
            .map(|ip| (ip, CandidateSource::CdnHeader))
            .or_else(|| {
                candidates::single_value(headers, &self.real_ip_header)
                    .map(|ip| (ip, CandidateSource::RealIpHeader))
            })
            .or_else(|| candidates::forwarded_for(headers).map(|ip| (ip, CandidateSource::Forwarded)))
            .or_else(|| {
                candidates::x_forwarded_for(headers).map(|ip| (ip, CandidateSource::XForwardedFor))
            });

        match found {
            Some((address, source)) => self.finish(address, source),
            None => self.finish(peer, CandidateSource::DirectPeer),
        }
    }

    fn finish(&self, address: IpAddr, source: CandidateSource) -> Resolution {
        tracing::trace!(client = %address, source = %source, "Client address resolved");
        metrics::record_resolution(source.as_str());
        Resolution { address, source }
    }
}

fn header_name(field: &'static str, raw: &str) -> Result<HeaderName, ConfigError> {
    HeaderName::from_bytes(raw.trim().as_bytes()).map_err(|e| {
        ConfigError::Validation(vec![crate::config::ValidationError {
            field,
            message: e.to_string(),
        }])
    })
}
