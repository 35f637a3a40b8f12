//! Address enrichment subsystem.
//!
//! # Data Flow
//! ```text
//! canonical IpAddr
//!     → pipeline.rs (concurrent fan-out, timeouts, failure policy)
//!         → asn.rs        (GeoLite2-ASN    → isp)
//!         → city.rs       (GeoLite2-City   → location)
//!         → reputation.rs (AbuseIPDB check → risk)
//!     → ResultAggregate
//! ```
//!
//! # Design Decisions
//! - Each enricher owns exactly one section of the result
//! - MaxMind readers live behind `mmdb::MmdbHandle` and can be swapped
//!   while lookups are running
//! - The result is a fresh value per request; nothing is shared across lookups

pub mod asn;
pub mod city;
pub mod enricher;
pub mod mmdb;
pub mod pipeline;
pub mod reputation;
pub mod types;

pub use asn::AsnEnricher;
pub use city::CityEnricher;
pub use enricher::{Criticality, Enricher, EnricherError};
pub use mmdb::{DatabaseWatcher, MmdbHandle};
pub use pipeline::{EnrichmentFailure, EnrichmentPipeline, EnrichmentReport, EnrichmentStage};
pub use reputation::ReputationEnricher;
pub use types::{Contribution, IspInfo, LocationInfo, ResultAggregate, RiskInfo, Section};
