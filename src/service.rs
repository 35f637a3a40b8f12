//! The transport-agnostic lookup service.
//!
//! Couples the trust-boundary resolver with the enrichment pipeline. The
//! HTTP layer and the CLI both go through this type and map its errors to
//! their own surface.

use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderMap;

use crate::enrich::{EnrichmentPipeline, ResultAggregate};
use crate::error::LookupError;
use crate::net::parse_ip;
use crate::resolver::{Resolution, TrustBoundaryResolver};

/// Resolver and pipeline, built once and shared by every request.
#[derive(Debug, Clone)]
pub struct LookupService {
    resolver: TrustBoundaryResolver,
    pipeline: EnrichmentPipeline,
}

impl LookupService {
    pub fn new(resolver: TrustBoundaryResolver, pipeline: EnrichmentPipeline) -> Self {
        Self { resolver, pipeline }
    }

    pub fn resolver(&self) -> &TrustBoundaryResolver {
        &self.resolver
    }

    pub fn pipeline(&self) -> &EnrichmentPipeline {
        &self.pipeline
    }

    /// The client address for a request, or `None` when the peer is unusable.
    pub fn client_address(&self, peer: &str, headers: &HeaderMap) -> Option<IpAddr> {
        match self.resolver.resolve(peer, headers) {
            Ok(addr) => Some(addr),
            Err(e) => {
                tracing::warn!(error = %e, "Unable to determine client address");
                None
            }
        }
    }

    /// Resolve a typed socket peer.
    pub fn resolve_peer(&self, peer: SocketAddr, headers: &HeaderMap) -> Resolution {
        self.resolver.resolve_peer(peer, headers)
    }

    /// Enrich an already-resolved address.
    pub async fn enrich(&self, addr: IpAddr) -> Result<ResultAggregate, LookupError> {
        self.pipeline.enrich(addr).await
    }

    /// Parse a caller-supplied address literal and enrich it.
    pub async fn lookup(&self, input: &str) -> Result<ResultAggregate, LookupError> {
        let addr = parse_ip(input).ok_or_else(|| LookupError::InvalidAddress {
            input: input.to_string(),
        })?;
        self.enrich(addr).await
    }

    /// Resolve the client behind `peer` and enrich it.
    pub async fn lookup_client(
        &self,
        peer: &str,
        headers: &HeaderMap,
    ) -> Result<ResultAggregate, LookupError> {
        let addr = self.resolver.resolve(peer, headers)?;
        self.enrich(addr).await
    }
}
