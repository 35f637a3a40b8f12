//! Network ownership from the GeoLite2-ASN database.

use std::net::IpAddr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use crate::enrich::enricher::{Enricher, EnricherError};
use crate::enrich::mmdb::MmdbHandle;
use crate::enrich::types::{Contribution, IspInfo, Section};

/// Only the fields we need from a GeoLite2-ASN record.
#[derive(Debug, Default, Deserialize)]
struct AsnRecord {
    #[serde(default)]
    autonomous_system_number: u32,
    #[serde(default)]
    autonomous_system_organization: String,
}

impl AsnRecord {
    fn into_contribution(self) -> Contribution {
        if self.autonomous_system_number == 0 && self.autonomous_system_organization.is_empty() {
            return Contribution::NotFound;
        }
        Contribution::Isp(IspInfo {
            asn: format!("AS{}", self.autonomous_system_number),
            org: self.autonomous_system_organization.clone(),
            isp_name: self.autonomous_system_organization,
        })
    }
}

/// Fills the `isp` section.
#[derive(Debug, Clone)]
pub struct AsnEnricher {
    db: Arc<MmdbHandle>,
}

impl AsnEnricher {
    pub fn new(db: Arc<MmdbHandle>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Enricher for AsnEnricher {
    fn name(&self) -> &'static str {
        "asn"
    }

    fn section(&self) -> Section {
        Section::Isp
    }

    async fn enrich(&self, addr: IpAddr) -> Result<Contribution, EnricherError> {
        Ok(self
            .db
            .lookup::<AsnRecord>(addr)?
            .map(AsnRecord::into_contribution)
            .unwrap_or(Contribution::NotFound))
    }
}
