//! Abuse reputation from the AbuseIPDB `check` API.
//!
//! # Responsibilities
//! - Query the remote API with an explicit, short timeout
//! - Treat any non-200 answer as a source failure
//! - Map the response into the `risk` section
//!
//! This source sits on the request's critical path, so it is configured
//! as optional: a slow or failing API only leaves `risk` zero-valued.

use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::config::ReputationConfig;
use crate::enrich::enricher::{Enricher, EnricherError};
use crate::enrich::types::{Contribution, RiskInfo, Section};

const CHECK_PATH: &str = "/api/v2/check";

#[derive(Debug, Deserialize)]
struct CheckResponse {
    data: CheckData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct CheckData {
    abuse_confidence_score: u32,
    usage_type: Option<String>,
    is_tor: bool,
    total_reports: u32,
    num_distinct_users: u32,
    last_reported_at: Option<DateTime<Utc>>,
}

impl From<CheckData> for RiskInfo {
    fn from(data: CheckData) -> Self {
        RiskInfo {
            abuse_score: data.abuse_confidence_score,
            usage_type: data.usage_type.unwrap_or_default(),
            is_tor: data.is_tor,
            total_reports: data.total_reports,
            distinct_reporters: data.num_distinct_users,
            last_reported_at: data.last_reported_at,
        }
    }
}

/// Fills the `risk` section.
#[derive(Debug, Clone)]
pub struct ReputationEnricher {
    client: reqwest::Client,
    check_url: String,
    api_key: String,
    max_age_days: u32,
}

impl ReputationEnricher {
    pub fn new(config: &ReputationConfig) -> Result<Self, EnricherError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;

        Ok(Self {
            client,
            check_url: format!("{}{}", config.base_url.trim_end_matches('/'), CHECK_PATH),
            api_key: config.api_key.clone(),
            max_age_days: config.max_age_days,
        })
    }
}

#[async_trait]
impl Enricher for ReputationEnricher {
    fn name(&self) -> &'static str {
        "reputation"
    }

    fn section(&self) -> Section {
        Section::Risk
    }

    async fn enrich(&self, addr: IpAddr) -> Result<Contribution, EnricherError> {
        let response = self
            .client
            .get(&self.check_url)
            .query(&[
                ("ipAddress", addr.to_string()),
                ("maxAgeInDays", self.max_age_days.to_string()),
                ("verbose", String::new()),
            ])
            .header("Key", &self.api_key)
            .header(ACCEPT, "application/json")
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(EnricherError::Status(response.status().as_u16()));
        }

        let body = response.bytes().await?;
        let parsed: CheckResponse =
            serde_json::from_slice(&body).map_err(|e| EnricherError::Decode(e.to_string()))?;

        Ok(Contribution::Risk(parsed.data.into()))
    }
}
