//! Client IP resolution and enrichment.
//!
//! Resolves the real client address of a request behind a chain of
//! declared-trusted proxies, then enriches it with network ownership,
//! geolocation and abuse reputation.

// Core
pub mod enrich;
pub mod net;
pub mod resolver;
pub mod service;

// Surfaces
pub mod http;

// Cross-cutting concerns
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod observability;

pub use config::ServiceConfig;
pub use enrich::{EnrichmentPipeline, ResultAggregate};
pub use error::LookupError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use resolver::TrustBoundaryResolver;
pub use service::LookupService;
