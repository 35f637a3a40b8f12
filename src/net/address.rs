//! Address normalization.
//!
//! # Responsibilities
//! - Collapse IPv4-mapped IPv6 addresses into plain IPv4
//! - Strip IPv6 zone identifiers (`fe80::1%eth0`)
//! - Split optional ports off peer addresses and bracketed IPv6 literals
//!
//! Every address that leaves this module is in canonical form, so
//! membership tests and equality checks downstream never see two shapes
//! of the same host.

use std::net::IpAddr;

/// Return the canonical form of an address.
///
/// `::ffff:192.0.2.1` becomes `192.0.2.1`; everything else is unchanged.
pub fn normalize(addr: IpAddr) -> IpAddr {
    addr.to_canonical()
}

/// Parse a bare address literal (no port).
///
/// Surrounding whitespace and an IPv6 zone suffix are ignored.
pub fn parse_ip(raw: &str) -> Option<IpAddr> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let without_zone = match trimmed.split_once('%') {
        Some((host, _zone)) => host,
        None => trimmed,
    };
    without_zone.parse::<IpAddr>().ok().map(normalize)
}

/// Parse an address that may carry a port and/or IPv6 brackets.
///
/// Accepted shapes: `192.0.2.1`, `192.0.2.1:8080`, `2001:db8::1`,
/// `[2001:db8::1]`, `[2001:db8::1]:8080`.
pub fn parse_host_port(raw: &str) -> Option<IpAddr> {
    let trimmed = raw.trim();

    if let Some(rest) = trimmed.strip_prefix('[') {
        let (host, tail) = rest.split_once(']')?;
        if !tail.is_empty() {
            let port = tail.strip_prefix(':')?;
            if !is_port(port) {
                return None;
            }
        }
        return parse_ip(host);
    }

    // A single colon can only be a v4 host:port separator.
    if trimmed.matches(':').count() == 1 {
        let (host, port) = trimmed.split_once(':')?;
        if !is_port(port) {
            return None;
        }
        return match parse_ip(host)? {
            v4 @ IpAddr::V4(_) => Some(v4),
            IpAddr::V6(_) => None,
        };
    }

    parse_ip(trimmed)
}

fn is_port(raw: &str) -> bool {
    !raw.is_empty() && raw.bytes().all(|b| b.is_ascii_digit()) && raw.parse::<u16>().is_ok()
}
