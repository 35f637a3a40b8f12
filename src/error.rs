//! Errors surfaced to callers of the lookup service.

use std::time::Duration;

use thiserror::Error;

use crate::enrich::EnricherError;
use crate::resolver::ResolutionError;

/// A failed lookup, tagged with the stage that failed.
#[derive(Debug, Error)]
pub enum LookupError {
    /// The direct peer could not be turned into an address.
    #[error(transparent)]
    NoAddress(#[from] ResolutionError),

    /// A caller-supplied address literal did not parse.
    #[error("invalid ip {input:?}")]
    InvalidAddress { input: String },

    /// A required enrichment source failed.
    #[error("{stage} lookup failed: {source}")]
    SourceUnavailable {
        stage: &'static str,
        #[source]
        source: EnricherError,
    },

    /// The enrichment budget ran out before every source answered.
    #[error("enrichment exceeded its {0:?} budget")]
    DeadlineExceeded(Duration),
}

impl LookupError {
    /// Name of the stage that failed.
    pub fn stage(&self) -> &'static str {
        match self {
            LookupError::NoAddress(_) => "resolve",
            LookupError::InvalidAddress { .. } => "input",
            LookupError::SourceUnavailable { stage, .. } => *stage,
            LookupError::DeadlineExceeded(_) => "pipeline",
        }
    }
}
