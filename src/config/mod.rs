//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → ServiceConfig (validated, immutable)
//!     → lifecycle::startup builds the trust set and enrichers from it
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - Malformed trust ranges are a startup failure, never a request failure

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, load_from_env, ConfigError};
pub use schema::{
    EnrichmentConfig, GeoIpConfig, ListenerConfig, ObservabilityConfig, ReputationConfig,
    ServiceConfig, TrustConfig,
};
pub use validation::ValidationError;
