//! Concurrent enrichment pipeline.
//!
//! # Responsibilities
//! - Fan one address out to every configured enricher concurrently
//! - Bound each stage by its own timeout and the whole run by a budget
//! - Apply the required/optional failure policy
//! - Merge contributions into a fresh `ResultAggregate` in stage order
//!
//! # Data Flow
//! ```text
//! addr ──┬──▶ asn        (required, 250ms) ──┐
//!        ├──▶ city       (required, 250ms) ──┼──▶ merge ──▶ ResultAggregate
//!        └──▶ reputation (optional, 500ms) ──┘
//!                  │
//!                  └── failure: required ─▶ abort with LookupError
//!                               optional ─▶ warn, section stays zero
//! ```
//!
//! # Design Decisions
//! - Section ownership is checked when the pipeline is built; two stages
//!   writing the same section is a configuration error.
//! - Every stage timeout must be strictly below the budget, so a single slow
//!   source can never consume the whole request.
//! - Dropping the returned future cancels all in-flight stages.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::join_all;
use futures_util::stream::{FuturesUnordered, StreamExt};

use crate::config::ConfigError;
use crate::enrich::enricher::{Criticality, Enricher, EnricherError};
use crate::enrich::types::{Contribution, ResultAggregate};
use crate::error::LookupError;
use crate::net::normalize;
use crate::observability::metrics;

/// One enricher with its failure policy and timeout.
#[derive(Clone)]
pub struct EnrichmentStage {
    enricher: Arc<dyn Enricher>,
    criticality: Criticality,
    timeout: Duration,
}

impl EnrichmentStage {
    pub fn new(enricher: Arc<dyn Enricher>, criticality: Criticality, timeout: Duration) -> Self {
        Self {
            enricher,
            criticality,
            timeout,
        }
    }

    pub fn required(enricher: Arc<dyn Enricher>, timeout: Duration) -> Self {
        Self::new(enricher, Criticality::Required, timeout)
    }

    pub fn optional(enricher: Arc<dyn Enricher>, timeout: Duration) -> Self {
        Self::new(enricher, Criticality::Optional, timeout)
    }

    pub fn name(&self) -> &'static str {
        self.enricher.name()
    }

    pub fn criticality(&self) -> Criticality {
        self.criticality
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn invoke(&self, addr: IpAddr) -> Result<Contribution, EnricherError> {
        let start = Instant::now();
        let result = match tokio::time::timeout(self.timeout, self.enricher.enrich(addr)).await {
            Ok(result) => result,
            Err(_) => Err(EnricherError::Timeout(self.timeout)),
        };
        metrics::record_enrichment(self.name(), start);

        let contribution = result?;
        let expected = self.enricher.section();
        match contribution.section() {
            Some(actual) if actual != expected => {
                Err(EnricherError::SectionMismatch { expected, actual })
            }
            _ => Ok(contribution),
        }
    }
}

impl std::fmt::Debug for EnrichmentStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnrichmentStage")
            .field("name", &self.name())
            .field("section", &self.enricher.section())
            .field("criticality", &self.criticality)
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// A stage that did not contribute.
#[derive(Debug)]
pub struct EnrichmentFailure {
    pub stage: &'static str,
    pub criticality: Criticality,
    pub error: EnricherError,
}

/// Outcome of running every stage to completion.
#[derive(Debug)]
pub struct EnrichmentReport {
    pub aggregate: ResultAggregate,
    pub failures: Vec<EnrichmentFailure>,
}

impl EnrichmentReport {
    /// True when some optional stage failed but no required one did.
    pub fn is_degraded(&self) -> bool {
        !self.failures.is_empty()
            && self
                .failures
                .iter()
                .all(|f| f.criticality == Criticality::Optional)
    }

    /// Apply the failure policy: the first required failure, in stage order,
    /// becomes the error.
    pub fn into_result(self) -> Result<ResultAggregate, LookupError> {
        let required = self
            .failures
            .into_iter()
            .find(|f| f.criticality == Criticality::Required);

        match required {
            Some(failure) => Err(LookupError::SourceUnavailable {
                stage: failure.stage,
                source: failure.error,
            }),
            None => Ok(self.aggregate),
        }
    }
}

/// Builder for [`EnrichmentPipeline`].
#[derive(Debug)]
pub struct PipelineBuilder {
    budget: Duration,
    stages: Vec<EnrichmentStage>,
}

impl PipelineBuilder {
    pub fn stage(mut self, stage: EnrichmentStage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn build(self) -> Result<EnrichmentPipeline, ConfigError> {
        let mut owners = HashSet::new();
        for stage in &self.stages {
            let section = stage.enricher.section();
            if !owners.insert(section) {
                let first = self
                    .stages
                    .iter()
                    .find(|s| s.enricher.section() == section)
                    .map(|s| s.name())
                    .unwrap_or_default();
                return Err(ConfigError::OverlappingSections {
                    section: section.as_str(),
                    first,
                    second: stage.name(),
                });
            }

            if stage.timeout >= self.budget {
                return Err(ConfigError::StageTimeoutExceedsBudget {
                    stage: stage.name(),
                    timeout_ms: stage.timeout.as_millis(),
                    budget_ms: self.budget.as_millis(),
                });
            }
        }

        tracing::debug!(
            stages = ?self.stages.iter().map(|s| s.name()).collect::<Vec<_>>(),
            budget_ms = self.budget.as_millis() as u64,
            "Enrichment pipeline built"
        );

        Ok(EnrichmentPipeline {
            budget: self.budget,
            stages: self.stages,
        })
    }
}

/// Runs a fixed, ordered set of enrichment stages against an address.
#[derive(Debug, Clone)]
pub struct EnrichmentPipeline {
    budget: Duration,
    stages: Vec<EnrichmentStage>,
}

impl EnrichmentPipeline {
    pub fn builder(budget: Duration) -> PipelineBuilder {
        PipelineBuilder {
            budget,
            stages: Vec::new(),
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn stages(&self) -> &[EnrichmentStage] {
        &self.stages
    }

    /// Run every stage to completion and report all failures.
    ///
    /// IPv4-mapped IPv6 input is looked up (and reported) as plain IPv4.
    ///
    /// Never fails: the caller decides what the failures mean. Bounded by the
    /// slowest stage timeout.
    pub async fn run(&self, addr: IpAddr) -> EnrichmentReport {
        let addr = normalize(addr);
        let results = join_all(self.stages.iter().map(|stage| stage.invoke(addr))).await;

        let mut aggregate = ResultAggregate::new(addr);
        let mut failures = Vec::new();
        for (stage, result) in self.stages.iter().zip(results) {
            match result {
                Ok(contribution) => aggregate.apply(contribution),
                Err(error) => {
                    log_failure(stage, &error);
                    failures.push(EnrichmentFailure {
                        stage: stage.name(),
                        criticality: stage.criticality,
                        error,
                    });
                }
            }
        }

        EnrichmentReport {
            aggregate,
            failures,
        }
    }

    /// Enrich `addr`, failing fast on the first required stage that fails.
    ///
    /// Remaining stages are cancelled as soon as the outcome is decided.
    pub async fn enrich(&self, addr: IpAddr) -> Result<ResultAggregate, LookupError> {
        let addr = normalize(addr);
        match tokio::time::timeout(self.budget, self.enrich_inner(addr)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(ip = %addr, budget_ms = self.budget.as_millis() as u64, "Enrichment budget exceeded");
                Err(LookupError::DeadlineExceeded(self.budget))
            }
        }
    }

    async fn enrich_inner(&self, addr: IpAddr) -> Result<ResultAggregate, LookupError> {
        let mut pending: FuturesUnordered<_> = self
            .stages
            .iter()
            .enumerate()
            .map(|(index, stage)| async move { (index, stage.invoke(addr).await) })
            .collect();

        let mut slots: Vec<Option<Contribution>> = vec![None; self.stages.len()];

        while let Some((index, result)) = pending.next().await {
            let stage = &self.stages[index];
            match result {
                Ok(contribution) => slots[index] = Some(contribution),
                Err(error) => {
                    log_failure(stage, &error);
                    if stage.criticality == Criticality::Required {
                        return Err(LookupError::SourceUnavailable {
                            stage: stage.name(),
                            source: error,
                        });
                    }
                }
            }
        }

        let mut aggregate = ResultAggregate::new(addr);
        for contribution in slots.into_iter().flatten() {
            aggregate.apply(contribution);
        }
        Ok(aggregate)
    }
}

fn log_failure(stage: &EnrichmentStage, error: &EnricherError) {
    metrics::record_enrichment_failure(stage.name(), stage.criticality.as_str());
    match stage.criticality {
        Criticality::Required => {
            tracing::error!(stage = stage.name(), error = %error, "Required enrichment source failed")
        }
        Criticality::Optional => {
            tracing::warn!(stage = stage.name(), error = %error, "Optional enrichment source failed, continuing")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::types::{IspInfo, LocationInfo, RiskInfo, Section};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behavior {
        Answer(Contribution),
        Fail,
        Sleep(Duration),
        /// Answers with the address it was asked about as the org name.
        Echo,
    }

    struct Fake {
        name: &'static str,
        section: Section,
        behavior: Behavior,
        calls: AtomicUsize,
    }

    impl Fake {
        fn new(name: &'static str, section: Section, behavior: Behavior) -> Arc<Self> {
            Arc::new(Self {
                name,
                section,
                behavior,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Enricher for Fake {
        fn name(&self) -> &'static str {
            self.name
        }

        fn section(&self) -> Section {
            self.section
        }

        async fn enrich(&self, addr: IpAddr) -> Result<Contribution, EnricherError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                Behavior::Answer(c) => Ok(c.clone()),
                Behavior::Fail => Err(EnricherError::Status(503)),
                Behavior::Sleep(d) => {
                    tokio::time::sleep(*d).await;
                    Ok(Contribution::NotFound)
                }
                Behavior::Echo => Ok(Contribution::Isp(IspInfo {
                    org: addr.to_string(),
                    ..Default::default()
                })),
            }
        }
    }

    fn isp() -> Contribution {
        Contribution::Isp(IspInfo {
            asn: "AS64496".into(),
            org: "Example".into(),
            isp_name: "Example".into(),
        })
    }

    fn location() -> Contribution {
        Contribution::Location(LocationInfo {
            country_code: "NL".into(),
            ..Default::default()
        })
    }

    fn risk() -> Contribution {
        Contribution::Risk(RiskInfo {
            abuse_score: 42,
            ..Default::default()
        })
    }

    const MS_100: Duration = Duration::from_millis(100);
    const BUDGET: Duration = Duration::from_secs(1);

    fn addr() -> IpAddr {
        "198.51.100.7".parse().unwrap()
    }

    fn full_pipeline(reputation: Behavior) -> EnrichmentPipeline {
        EnrichmentPipeline::builder(BUDGET)
            .stage(EnrichmentStage::required(
                Fake::new("asn", Section::Isp, Behavior::Answer(isp())),
                MS_100,
            ))
            .stage(EnrichmentStage::required(
                Fake::new("city", Section::Location, Behavior::Answer(location())),
                MS_100,
            ))
            .stage(EnrichmentStage::optional(
                Fake::new("reputation", Section::Risk, reputation),
                MS_100,
            ))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn all_sources_fill_their_sections() {
        let result = full_pipeline(Behavior::Answer(risk())).enrich(addr()).await.unwrap();
        assert_eq!(result.ip, addr());
        assert_eq!(result.isp.asn, "AS64496");
        assert_eq!(result.location.country_code, "NL");
        assert_eq!(result.risk.abuse_score, 42);
    }

    #[tokio::test]
    async fn mapped_v6_input_is_looked_up_as_v4() {
        let mapped: IpAddr = "::ffff:198.51.100.7".parse().unwrap();
        let pipeline = EnrichmentPipeline::builder(BUDGET)
            .stage(EnrichmentStage::required(
                Fake::new("asn", Section::Isp, Behavior::Echo),
                MS_100,
            ))
            .build()
            .unwrap();

        let result = pipeline.enrich(mapped).await.unwrap();
        assert_eq!(result.ip, addr());
        assert_eq!(result.isp.org, "198.51.100.7");

        let report = pipeline.run(mapped).await;
        assert_eq!(report.aggregate.ip, addr());
        assert_eq!(report.aggregate.isp.org, "198.51.100.7");
    }

    #[tokio::test]
    async fn optional_failure_leaves_section_zero() {
        let result = full_pipeline(Behavior::Fail).enrich(addr()).await.unwrap();
        assert_eq!(result.isp.asn, "AS64496");
        assert_eq!(result.risk, RiskInfo::default());
    }

    #[tokio::test]
    async fn optional_timeout_leaves_section_zero() {
        let pipeline = full_pipeline(Behavior::Sleep(Duration::from_millis(500)));
        let start = Instant::now();
        let result = pipeline.enrich(addr()).await.unwrap();
        assert!(start.elapsed() < Duration::from_millis(450));
        assert_eq!(result.risk, RiskInfo::default());
        assert_eq!(result.location.country_code, "NL");
    }

    #[tokio::test]
    async fn required_failure_names_the_stage() {
        let pipeline = EnrichmentPipeline::builder(BUDGET)
            .stage(EnrichmentStage::required(
                Fake::new("asn", Section::Isp, Behavior::Fail),
                MS_100,
            ))
            .stage(EnrichmentStage::required(
                Fake::new("city", Section::Location, Behavior::Answer(location())),
                MS_100,
            ))
            .build()
            .unwrap();

        let err = pipeline.enrich(addr()).await.unwrap_err();
        assert_eq!(err.stage(), "asn");
        assert!(matches!(err, LookupError::SourceUnavailable { .. }));
    }

    #[tokio::test]
    async fn required_failure_does_not_wait_for_slow_stages() {
        let pipeline = EnrichmentPipeline::builder(BUDGET)
            .stage(EnrichmentStage::required(
                Fake::new("asn", Section::Isp, Behavior::Fail),
                MS_100,
            ))
            .stage(EnrichmentStage::optional(
                Fake::new("reputation", Section::Risk, Behavior::Sleep(Duration::from_millis(800))),
                Duration::from_millis(900),
            ))
            .build()
            .unwrap();

        let start = Instant::now();
        assert!(pipeline.enrich(addr()).await.is_err());
        assert!(start.elapsed() < Duration::from_millis(500));
    }

    #[tokio::test]
    async fn required_timeout_is_a_failure() {
        let pipeline = EnrichmentPipeline::builder(BUDGET)
            .stage(EnrichmentStage::required(
                Fake::new("city", Section::Location, Behavior::Sleep(Duration::from_millis(500))),
                Duration::from_millis(50),
            ))
            .build()
            .unwrap();

        match pipeline.enrich(addr()).await {
            Err(LookupError::SourceUnavailable { stage, source }) => {
                assert_eq!(stage, "city");
                assert!(matches!(source, EnricherError::Timeout(_)));
            }
            other => panic!("expected city timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn not_found_is_not_a_failure() {
        let pipeline = EnrichmentPipeline::builder(BUDGET)
            .stage(EnrichmentStage::required(
                Fake::new("asn", Section::Isp, Behavior::Answer(Contribution::NotFound)),
                MS_100,
            ))
            .build()
            .unwrap();

        let report = pipeline.run(addr()).await;
        assert!(report.failures.is_empty());
        assert_eq!(report.aggregate, ResultAggregate::new(addr()));
    }

    #[tokio::test]
    async fn wrong_section_is_rejected_at_runtime() {
        let pipeline = EnrichmentPipeline::builder(BUDGET)
            .stage(EnrichmentStage::optional(
                Fake::new("liar", Section::Risk, Behavior::Answer(isp())),
                MS_100,
            ))
            .build()
            .unwrap();

        let report = pipeline.run(addr()).await;
        assert_eq!(report.aggregate.isp, IspInfo::default());
        assert!(matches!(
            report.failures[0].error,
            EnricherError::SectionMismatch { expected: Section::Risk, actual: Section::Isp }
        ));
        assert!(report.is_degraded());
    }

    #[tokio::test]
    async fn report_collects_every_failure() {
        let pipeline = EnrichmentPipeline::builder(BUDGET)
            .stage(EnrichmentStage::required(
                Fake::new("asn", Section::Isp, Behavior::Answer(isp())),
                MS_100,
            ))
            .stage(EnrichmentStage::required(
                Fake::new("city", Section::Location, Behavior::Fail),
                MS_100,
            ))
            .stage(EnrichmentStage::optional(
                Fake::new("reputation", Section::Risk, Behavior::Fail),
                MS_100,
            ))
            .build()
            .unwrap();

        let report = pipeline.run(addr()).await;
        let stages: Vec<_> = report.failures.iter().map(|f| f.stage).collect();
        assert_eq!(stages, vec!["city", "reputation"]);
        assert!(!report.is_degraded());
        assert_eq!(report.aggregate.isp.asn, "AS64496");

        let err = report.into_result().unwrap_err();
        assert_eq!(err.stage(), "city");
    }

    #[tokio::test]
    async fn repeated_lookups_are_identical() {
        let pipeline = full_pipeline(Behavior::Answer(risk()));
        let first = pipeline.enrich(addr()).await.unwrap();
        let second = pipeline.enrich(addr()).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn every_stage_runs_once_per_lookup() {
        let asn = Fake::new("asn", Section::Isp, Behavior::Answer(isp()));
        let city = Fake::new("city", Section::Location, Behavior::Answer(location()));
        let pipeline = EnrichmentPipeline::builder(BUDGET)
            .stage(EnrichmentStage::required(asn.clone(), MS_100))
            .stage(EnrichmentStage::required(city.clone(), MS_100))
            .build()
            .unwrap();

        pipeline.enrich(addr()).await.unwrap();
        assert_eq!(asn.calls.load(Ordering::SeqCst), 1);
        assert_eq!(city.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn overlapping_sections_are_rejected() {
        let err = EnrichmentPipeline::builder(BUDGET)
            .stage(EnrichmentStage::required(
                Fake::new("asn", Section::Isp, Behavior::Fail),
                MS_100,
            ))
            .stage(EnrichmentStage::optional(
                Fake::new("other-asn", Section::Isp, Behavior::Fail),
                MS_100,
            ))
            .build()
            .unwrap_err();

        match err {
            ConfigError::OverlappingSections { section, first, second } => {
                assert_eq!(section, "isp");
                assert_eq!(first, "asn");
                assert_eq!(second, "other-asn");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn stage_timeout_must_fit_the_budget() {
        let err = EnrichmentPipeline::builder(Duration::from_millis(200))
            .stage(EnrichmentStage::required(
                Fake::new("asn", Section::Isp, Behavior::Fail),
                Duration::from_millis(200),
            ))
            .build()
            .unwrap_err();

        assert!(matches!(err, ConfigError::StageTimeoutExceedsBudget { stage: "asn", .. }));
    }

    #[tokio::test]
    async fn empty_pipeline_returns_zero_valued_result() {
        let pipeline = EnrichmentPipeline::builder(BUDGET).build().unwrap();
        assert_eq!(pipeline.enrich(addr()).await.unwrap(), ResultAggregate::new(addr()));
    }
}
