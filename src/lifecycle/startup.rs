//! Startup orchestration.
//!
//! # Responsibilities
//! - Turn a validated `ServiceConfig` into a ready `LookupService`
//! - Open both MaxMind databases and build the enrichment stages
//! - Start the database watcher when enabled
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - ASN and City are required stages; reputation is optional and only
//!   configured when it has an API key

use std::sync::Arc;
use std::time::Duration;

use maxminddb::MaxMindDBError;
use notify::RecommendedWatcher;
use thiserror::Error;

use crate::config::{ConfigError, ServiceConfig};
use crate::enrich::{
    AsnEnricher, CityEnricher, DatabaseWatcher, EnricherError, EnrichmentPipeline, EnrichmentStage,
    MmdbHandle, ReputationEnricher,
};
use crate::resolver::TrustBoundaryResolver;
use crate::service::LookupService;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to open {name} database {path}: {source}")]
    Database {
        name: &'static str,
        path: String,
        #[source]
        source: MaxMindDBError,
    },

    #[error("failed to build reputation client: {0}")]
    Reputation(#[source] EnricherError),

    #[error("failed to start database watcher: {0}")]
    Watcher(#[from] notify::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// The running service plus the database handles it reads from.
pub struct Service {
    pub lookup: LookupService,
    pub databases: Vec<Arc<MmdbHandle>>,
}

/// Build the lookup service from configuration.
pub fn build_service(config: &ServiceConfig) -> Result<Service, StartupError> {
    let resolver = TrustBoundaryResolver::from_config(&config.trust)?;
    tracing::info!(
        trusted_proxies = %resolver.trusted(),
        ranges = resolver.trusted().len(),
        "Trusted proxy set loaded"
    );
    if resolver.trusted().is_empty() {
        tracing::warn!("No trusted proxies configured; forwarding headers will always be ignored");
    }

    let asn_db = Arc::new(open_database("asn", &config.geoip.asn_database)?);
    let city_db = Arc::new(open_database("city", &config.geoip.city_database)?);
    let lookup_timeout = Duration::from_millis(config.geoip.lookup_timeout_ms);

    let mut builder = EnrichmentPipeline::builder(Duration::from_millis(config.enrichment.budget_ms))
        .stage(EnrichmentStage::required(
            Arc::new(AsnEnricher::new(asn_db.clone())),
            lookup_timeout,
        ))
        .stage(EnrichmentStage::required(
            Arc::new(CityEnricher::new(city_db.clone())),
            lookup_timeout,
        ));

    if config.reputation.is_active() {
        let reputation = ReputationEnricher::new(&config.reputation).map_err(StartupError::Reputation)?;
        builder = builder.stage(EnrichmentStage::optional(
            Arc::new(reputation),
            Duration::from_millis(config.reputation.timeout_ms),
        ));
        tracing::info!(base_url = %config.reputation.base_url, "Reputation lookups enabled");
    } else {
        tracing::info!("Reputation lookups disabled; risk section will be empty");
    }

    let pipeline = builder.build()?;

    Ok(Service {
        lookup: LookupService::new(resolver, pipeline),
        databases: vec![asn_db, city_db],
    })
}

/// Start reloading databases on change if `geoip.watch` is set.
///
/// The returned watcher must be kept alive for as long as reloads are wanted.
pub fn start_watcher(
    config: &ServiceConfig,
    databases: &[Arc<MmdbHandle>],
) -> Result<Option<RecommendedWatcher>, StartupError> {
    if !config.geoip.watch {
        return Ok(None);
    }
    let watcher = DatabaseWatcher::new(databases.to_vec()).run()?;
    Ok(Some(watcher))
}

fn open_database(name: &'static str, path: &str) -> Result<MmdbHandle, StartupError> {
    MmdbHandle::open(name, path).map_err(|source| StartupError::Database {
        name,
        path: path.to_string(),
        source,
    })
}
