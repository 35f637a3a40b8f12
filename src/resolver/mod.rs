//! Client address resolution subsystem.
//!
//! # Data Flow
//! ```text
//! direct peer (text or SocketAddr) + request headers
//!     → trust_boundary.rs (is the peer a trusted proxy?)
//!     → candidates.rs (CDN / real-IP / Forwarded / XFF, in that order)
//!     → Resolution { address, source }
//! ```
//!
//! # Design Decisions
//! - Headers from an untrusted peer are never read for the decision
//! - Unparsable header values are skipped, not errors
//! - Only an unusable peer address fails the request

pub mod candidates;
pub mod trust_boundary;

pub use candidates::CandidateSource;
pub use trust_boundary::{Resolution, ResolutionError, TrustBoundaryResolver};
