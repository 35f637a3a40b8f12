//! Network address subsystem.
//!
//! # Data Flow
//! ```text
//! peer address / header value (text)
//!     → address.rs (strip port, zone, brackets; collapse v4-mapped v6)
//!     → canonical IpAddr
//!     → trusted.rs (CIDR membership for the trust decision)
//! ```

pub mod address;
pub mod trusted;

pub use address::{normalize, parse_host_port, parse_ip};
pub use trusted::TrustedProxySet;
