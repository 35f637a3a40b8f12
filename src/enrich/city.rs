//! Geolocation from the GeoLite2-City database.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;
use serde::Deserialize;

use crate::enrich::enricher::{Enricher, EnricherError};
use crate::enrich::mmdb::MmdbHandle;
use crate::enrich::types::{Contribution, LocationInfo, Section};

/// Source of "now" for the `localtime` field.
pub type Clock = fn() -> DateTime<Utc>;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Named {
    iso_code: String,
    names: HashMap<String, String>,
}

impl Named {
    fn english(&self) -> String {
        self.names.get("en").cloned().unwrap_or_default()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Postal {
    code: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Location {
    latitude: f64,
    longitude: f64,
    time_zone: String,
}

/// The subset of a GeoLite2-City record we read.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CityRecord {
    country: Named,
    city: Named,
    subdivisions: Vec<Named>,
    postal: Postal,
    location: Location,
}

impl CityRecord {
    fn into_location(self, now: DateTime<Utc>) -> LocationInfo {
        let state = self
            .subdivisions
            .first()
            .map(|s| {
                let name = s.english();
                if name.is_empty() {
                    s.iso_code.clone()
                } else {
                    name
                }
            })
            .unwrap_or_default();

        LocationInfo {
            country: self.country.english(),
            country_code: self.country.iso_code,
            city: self.city.english(),
            state,
            zip: self.postal.code,
            lat: self.location.latitude,
            lon: self.location.longitude,
            localtime: local_time(&self.location.time_zone, now),
            timezone: self.location.time_zone,
        }
    }
}

/// `now` rendered in the IANA zone `tz`, or empty if the zone is unknown.
pub fn local_time(tz: &str, now: DateTime<Utc>) -> String {
    if tz.is_empty() {
        return String::new();
    }
    match tz.parse::<Tz>() {
        Ok(zone) => now
            .with_timezone(&zone)
            .to_rfc3339_opts(SecondsFormat::Secs, true),
        Err(_) => {
            tracing::debug!(timezone = tz, "Unknown timezone in city record");
            String::new()
        }
    }
}

/// Fills the `location` section.
#[derive(Debug, Clone)]
pub struct CityEnricher {
    db: Arc<MmdbHandle>,
    clock: Clock,
}

impl CityEnricher {
    pub fn new(db: Arc<MmdbHandle>) -> Self {
        Self { db, clock: Utc::now }
    }

    /// Replace the clock, e.g. to make output reproducible.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }
}

#[async_trait]
impl Enricher for CityEnricher {
    fn name(&self) -> &'static str {
        "city"
    }

    fn section(&self) -> Section {
        Section::Location
    }

    async fn enrich(&self, addr: IpAddr) -> Result<Contribution, EnricherError> {
        match self.db.lookup::<CityRecord>(addr)? {
            Some(record) => Ok(Contribution::Location(record.into_location((self.clock)()))),
            None => Ok(Contribution::NotFound),
        }
    }
}
