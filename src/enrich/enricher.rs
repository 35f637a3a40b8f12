//! The enricher capability.
//!
//! Each enricher wraps one external source (a local database, a remote
//! API) and owns exactly one section of the result. Instances are built
//! once and invoked concurrently across requests.

use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::enrich::types::{Contribution, Section};

/// Whether a source's failure aborts the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Criticality {
    /// Failure aborts the lookup with an error naming the stage.
    Required,
    /// Failure is logged; the section stays zero-valued.
    Optional,
}

impl Criticality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Criticality::Required => "required",
            Criticality::Optional => "optional",
        }
    }
}

impl fmt::Display for Criticality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors talking to an enrichment source. "No record" is not one of them.
#[derive(Debug, Error)]
pub enum EnricherError {
    #[error("database error: {0}")]
    Database(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("http status {0}")]
    Status(u16),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("wrote the {actual} section but owns {expected}")]
    SectionMismatch { expected: Section, actual: Section },
}

/// A unit of work that augments an address with data from one source.
#[async_trait]
pub trait Enricher: Send + Sync {
    /// Stable name used for logs, metrics and error stages.
    fn name(&self) -> &'static str;

    /// The result section this enricher writes.
    fn section(&self) -> Section;

    /// Look the address up. `Ok(Contribution::NotFound)` when the source
    /// simply has no data for it.
    async fn enrich(&self, addr: IpAddr) -> Result<Contribution, EnricherError>;
}
