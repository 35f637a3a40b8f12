//! Trusted proxy ranges.
//!
//! # Responsibilities
//! - Parse the configured CIDR list once at startup
//! - Answer "is this peer inside a trusted range?" per request
//!
//! The set is immutable after construction and shared by reference, so
//! concurrent requests read it without locking.

use std::fmt;
use std::net::IpAddr;

use ipnet::IpNet;

use crate::config::loader::ConfigError;
use crate::net::address::normalize;

/// Immutable, ordered set of trusted network ranges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrustedProxySet {
    ranges: Vec<IpNet>,
}

impl TrustedProxySet {
    /// A set that trusts nothing; only the direct peer is ever used.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse CIDR entries. Blank entries are skipped; anything else that
    /// is not CIDR notation is a configuration error.
    pub fn parse<I, S>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ranges = Vec::new();
        for entry in entries {
            let raw = entry.as_ref().trim();
            if raw.is_empty() {
                continue;
            }
            let net: IpNet = raw.parse().map_err(|e: ipnet::AddrParseError| {
                ConfigError::InvalidCidr {
                    entry: raw.to_string(),
                    reason: e.to_string(),
                }
            })?;
            ranges.push(net.trunc());
        }
        Ok(Self { ranges })
    }

    /// Returns true if the address falls inside any trusted range.
    pub fn contains(&self, addr: IpAddr) -> bool {
        let addr = normalize(addr);
        self.ranges.iter().any(|net| net.contains(&addr))
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IpNet> {
        self.ranges.iter()
    }
}

impl fmt::Display for TrustedProxySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, net) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", net)?;
        }
        Ok(())
    }
}
