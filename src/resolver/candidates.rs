//! Candidate client addresses carried in forwarding headers.
//!
//! Each source yields zero or one address. Present-but-unparsable values
//! are skipped, never reported as errors.

use std::fmt;
use std::net::IpAddr;

use axum::http::header::{HeaderMap, FORWARDED};
use axum::http::HeaderName;

use crate::net::{parse_host_port, parse_ip};

/// `X-Forwarded-For` (not exported by the `http` crate).
pub const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");

/// Where the resolved client address came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateSource {
    /// The TCP peer itself.
    DirectPeer,
    /// Single-value header injected by a CDN edge.
    CdnHeader,
    /// Single-value header injected by the reverse proxy.
    RealIpHeader,
    /// RFC 7239 `Forwarded: for=`.
    Forwarded,
    /// Leftmost parsable `X-Forwarded-For` entry.
    XForwardedFor,
}

impl CandidateSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateSource::DirectPeer => "direct_peer",
            CandidateSource::CdnHeader => "cdn_header",
            CandidateSource::RealIpHeader => "real_ip_header",
            CandidateSource::Forwarded => "forwarded",
            CandidateSource::XForwardedFor => "x_forwarded_for",
        }
    }
}

impl fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address from a single-value header such as `CF-Connecting-IP`.
pub fn single_value(headers: &HeaderMap, name: &HeaderName) -> Option<IpAddr> {
    let value = headers.get(name)?.to_str().ok()?;
    parse_ip(value)
}

/// Address from the `for=` parameter of the first `Forwarded` element.
pub fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    let value = headers.get(FORWARDED)?.to_str().ok()?;
    parse_forwarded(value)
}

/// Parse one `Forwarded` header value.
///
/// `for="[2001:db8:cafe::17]:4711";proto=https, for=192.0.2.43`
/// yields `2001:db8:cafe::17`. Later elements are ignored.
pub fn parse_forwarded(value: &str) -> Option<IpAddr> {
    let first = value.split(',').next()?;

    let node = first.split(';').find_map(|pair| {
        let (key, val) = pair.split_once('=')?;
        key.trim().eq_ignore_ascii_case("for").then_some(val)
    })?;

    let node = node.trim().trim_matches('"');
    // "unknown" and obfuscated "_identifiers" simply fail to parse.
    parse_host_port(node)
}

/// First `X-Forwarded-For` entry that parses as an address.
///
/// Multiple header lines are treated as one comma-separated list in
/// arrival order.
pub fn x_forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .find_map(parse_ip)
}

/// Returns true if the request carries any header this module would read.
pub fn has_forwarding_headers(headers: &HeaderMap, cdn: &HeaderName, real_ip: &HeaderName) -> bool {
    headers.contains_key(cdn)
        || headers.contains_key(real_ip)
        || headers.contains_key(FORWARDED)
        || headers.contains_key(X_FORWARDED_FOR)
}
