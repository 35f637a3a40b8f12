//! Enrichment result types.
//!
//! `ResultAggregate` is the per-request output record. It is built fresh for
//! each lookup and each section is written by exactly one enricher.

use std::fmt;
use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Network ownership.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IspInfo {
    /// `AS<number>`, e.g. `AS15169`.
    pub asn: String,
    pub org: String,
    #[serde(rename = "isp")]
    pub isp_name: String,
}

/// Geolocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationInfo {
    pub country: String,
    pub country_code: String,
    pub city: String,
    pub state: String,
    #[serde(rename = "zipcode")]
    pub zip: String,
    #[serde(rename = "latitude")]
    pub lat: f64,
    #[serde(rename = "longitude")]
    pub lon: f64,
    pub timezone: String,
    /// Current wall-clock time in `timezone`, RFC 3339.
    pub localtime: String,
}

/// Abuse reputation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiskInfo {
    #[serde(rename = "abuse_confidence_score")]
    pub abuse_score: u32,
    pub usage_type: String,
    pub is_tor: bool,
    pub total_reports: u32,
    #[serde(rename = "number_of_users_reported")]
    pub distinct_reporters: u32,
    pub last_reported_at: Option<DateTime<Utc>>,
}

/// The assembled lookup result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultAggregate {
    pub ip: IpAddr,
    pub isp: IspInfo,
    pub location: LocationInfo,
    pub risk: RiskInfo,
}

impl ResultAggregate {
    /// A result with every section at its zero value.
    pub fn new(ip: IpAddr) -> Self {
        Self {
            ip,
            isp: IspInfo::default(),
            location: LocationInfo::default(),
            risk: RiskInfo::default(),
        }
    }

    /// Write one enricher's contribution into its section.
    pub fn apply(&mut self, contribution: Contribution) {
        match contribution {
            Contribution::Isp(isp) => self.isp = isp,
            Contribution::Location(location) => self.location = location,
            Contribution::Risk(risk) => self.risk = risk,
            Contribution::NotFound => {}
        }
    }
}

/// The part of `ResultAggregate` an enricher owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Isp,
    Location,
    Risk,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Isp => "isp",
            Section::Location => "location",
            Section::Risk => "risk",
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What one enricher produced for an address.
#[derive(Debug, Clone, PartialEq)]
pub enum Contribution {
    Isp(IspInfo),
    Location(LocationInfo),
    Risk(RiskInfo),
    /// The source has no record for the address. Not a failure.
    NotFound,
}

impl Contribution {
    /// The section this contribution writes, `None` for `NotFound`.
    pub fn section(&self) -> Option<Section> {
        match self {
            Contribution::Isp(_) => Some(Section::Isp),
            Contribution::Location(_) => Some(Section::Location),
            Contribution::Risk(_) => Some(Section::Risk),
            Contribution::NotFound => None,
        }
    }
}
