//! Resolving one configured metric end to end.
//!
//! # State machine
//! ```text
//! live resolution ──ok──► Resolved (cache written)
//!        │
//!       err
//!        ▼
//! cache lookup ──fresh──► CacheHit (degraded = true)
//!        │
//!   absent / stale
//!        ▼
//!     Failed (tagged error + attempt trail)
//! ```

use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;

use crate::cache::StalenessBoundedCache;
use crate::clock::Clock;
use crate::config::{AlignTo, FlagConfig, MetricConfig, MetricKind};
use crate::error::{AlignError, ErrorKind, ResolveFailure};
use crate::model::{
    round2, Components, Granularity, LegValue, MetricResult, ProviderAttempt, Series,
};
use crate::observability::metrics;
use crate::resolver::align::{AlignedPair, TimeSeriesAligner};
use crate::resolver::fallback::{ChainExhausted, FallbackChain, FallbackResolver, Resolution};

/// How the two aligned legs combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combine {
    /// `left / right * 100`
    Ratio,
    /// `left - right`
    Spread,
}

#[derive(Debug, Clone)]
pub enum MetricShape {
    Simple(FallbackChain),
    TwoLeg {
        left: FallbackChain,
        right: FallbackChain,
        aligner: TimeSeriesAligner,
        combine: Combine,
    },
}

/// Label attached when a value crosses a threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagRule {
    pub label: String,
    pub above: Option<f64>,
    pub below: Option<f64>,
}

impl FlagRule {
    pub fn applies(&self, value: f64) -> bool {
        self.above.is_some_and(|limit| value > limit)
            || self.below.is_some_and(|limit| value < limit)
    }
}

impl From<&FlagConfig> for FlagRule {
    fn from(config: &FlagConfig) -> Self {
        Self {
            label: config.label.clone(),
            above: config.above,
            below: config.below,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MetricDefinition {
    pub key: String,
    pub unit: String,
    pub shape: MetricShape,
    /// How long a successful result may stand in for live data.
    pub ttl: Duration,
    pub flag: Option<FlagRule>,
}

impl MetricDefinition {
    pub fn from_config(config: &MetricConfig, default_ttl: Duration) -> Self {
        let shape = match config.kind {
            MetricKind::Simple => MetricShape::Simple(FallbackChain::from_config(&config.chain)),
            MetricKind::Ratio | MetricKind::Spread => MetricShape::TwoLeg {
                left: FallbackChain::from_config(&config.left),
                right: FallbackChain::from_config(&config.right),
                aligner: aligner(config.align),
                combine: if config.kind == MetricKind::Ratio {
                    Combine::Ratio
                } else {
                    Combine::Spread
                },
            },
        };

        Self {
            key: config.key.clone(),
            unit: config.unit.clone(),
            shape,
            ttl: config.ttl_secs.map(Duration::from_secs).unwrap_or(default_ttl),
            flag: config.flag.as_ref().map(FlagRule::from),
        }
    }
}

fn aligner(align: AlignTo) -> TimeSeriesAligner {
    match align {
        AlignTo::Day => TimeSeriesAligner::new(Granularity::Day),
        AlignTo::Month => TimeSeriesAligner::new(Granularity::Month),
        AlignTo::Quarter => TimeSeriesAligner::new(Granularity::Quarter),
        AlignTo::Year => TimeSeriesAligner::new(Granularity::Year),
        AlignTo::Latest => TimeSeriesAligner::as_of(),
    }
}

pub struct MetricResolver {
    definition: MetricDefinition,
    fallback: Arc<FallbackResolver>,
    cache: StalenessBoundedCache,
    clock: Arc<dyn Clock>,
}

impl MetricResolver {
    pub fn new(
        definition: MetricDefinition,
        fallback: Arc<FallbackResolver>,
        cache: StalenessBoundedCache,
    ) -> Self {
        let clock = fallback.clock();
        Self {
            definition,
            fallback,
            cache,
            clock,
        }
    }

    pub fn key(&self) -> &str {
        &self.definition.key
    }

    /// Resolve live, falling back to a fresh cached value.
    pub async fn resolve(&self) -> Result<MetricResult, ResolveFailure> {
        let span = tracing::info_span!("resolve", metric = %self.definition.key);
        async {
            match self.resolve_live().await {
                Ok(result) => {
                    tracing::info!(
                        value = result.value,
                        source = %result.source,
                        "Resolved"
                    );
                    self.cache
                        .put(&self.definition.key, result.clone(), self.definition.ttl);
                    metrics::record_resolution(&self.definition.key, "resolved");
                    Ok(result)
                }
                Err(failure) => self.from_cache(failure),
            }
        }
        .instrument(span)
        .await
    }

    fn from_cache(&self, failure: ResolveFailure) -> Result<MetricResult, ResolveFailure> {
        let key = &self.definition.key;
        let now = self.clock.now();

        match self.cache.get(key) {
            Some(entry) if entry.is_fresh(now) => {
                tracing::warn!(
                    kind = failure.kind.as_str(),
                    age_secs = entry.age(now).as_secs(),
                    "Live resolution failed, serving cached value"
                );
                metrics::record_resolution(key, "cache_hit");
                let mut result = entry.result;
                result.degraded = true;
                Ok(result)
            }
            Some(entry) => {
                tracing::warn!(
                    kind = failure.kind.as_str(),
                    age_secs = entry.age(now).as_secs(),
                    ttl_secs = entry.ttl.as_secs(),
                    "Live resolution failed and cached value is stale"
                );
                metrics::record_resolution(key, "failed");
                Err(failure)
            }
            None => {
                tracing::warn!(
                    kind = failure.kind.as_str(),
                    error = %failure.message,
                    "Live resolution failed with nothing cached"
                );
                metrics::record_resolution(key, "failed");
                Err(failure)
            }
        }
    }

    async fn resolve_live(&self) -> Result<MetricResult, ResolveFailure> {
        match &self.definition.shape {
            MetricShape::Simple(chain) => self.resolve_simple(chain).await,
            MetricShape::TwoLeg {
                left,
                right,
                aligner,
                combine,
            } => self.resolve_two_leg(left, right, aligner, *combine).await,
        }
    }

    async fn resolve_simple(&self, chain: &FallbackChain) -> Result<MetricResult, ResolveFailure> {
        let Resolution { series, attempts } = self
            .fallback
            .resolve(chain)
            .await
            .map_err(|exhausted| self.exhausted(chain.len(), exhausted.attempts))?;

        let (period, value) = series.latest_valid().ok_or_else(|| {
            self.failure(ErrorKind::Internal, "resolved series is empty", attempts)
        })?;

        Ok(MetricResult {
            value,
            unit: self.definition.unit.clone(),
            as_of_period: Some(period),
            source: series.provider_id().to_string(),
            computed_at: self.clock.now(),
            degraded: false,
            change_percent: series.change_percent(),
            components: None,
            flags: self.flags(value),
        })
    }

    async fn resolve_two_leg(
        &self,
        left_chain: &FallbackChain,
        right_chain: &FallbackChain,
        aligner: &TimeSeriesAligner,
        combine: Combine,
    ) -> Result<MetricResult, ResolveFailure> {
        let (left, right) = tokio::join!(
            self.fallback.resolve(left_chain),
            self.fallback.resolve(right_chain)
        );

        let (left, right) = match (left, right) {
            (Ok(left), Ok(right)) => (left, right),
            (left, right) => {
                let mut failed = Vec::new();
                if left.is_err() {
                    failed.push("left");
                }
                if right.is_err() {
                    failed.push("right");
                }
                let mut attempts = trail(left);
                attempts.extend(trail(right));
                return Err(self.failure(
                    ErrorKind::AllSourcesExhausted,
                    format!("every provider failed for the {} leg", failed.join(" and ")),
                    attempts,
                ));
            }
        };

        let mut attempts = left.attempts;
        attempts.extend(right.attempts);

        let pair = aligner
            .align(&left.series, &right.series)
            .and_then(|pair| check_denominator(combine, &right.series, pair))
            .map_err(|e| self.failure(e.kind(), e.to_string(), attempts))?;

        let value = match combine {
            Combine::Ratio => round2(pair.left / pair.right * 100.0),
            Combine::Spread => round2(pair.left - pair.right),
        };
        let operator = match combine {
            Combine::Ratio => "/",
            Combine::Spread => "-",
        };

        tracing::debug!(
            period = %pair.period,
            left = pair.left,
            right = pair.right,
            "Aligned legs"
        );

        Ok(MetricResult {
            value,
            unit: self.definition.unit.clone(),
            as_of_period: Some(pair.period),
            source: format!(
                "{} {operator} {}",
                left.series.provider_id(),
                right.series.provider_id()
            ),
            computed_at: self.clock.now(),
            degraded: false,
            change_percent: None,
            components: Some(Components {
                left: leg(&left.series, pair.left),
                right: leg(&right.series, pair.right),
            }),
            flags: self.flags(value),
        })
    }

    fn flags(&self, value: f64) -> Vec<String> {
        self.definition
            .flag
            .iter()
            .filter(|rule| rule.applies(value))
            .map(|rule| rule.label.clone())
            .collect()
    }

    fn exhausted(&self, providers: usize, attempts: Vec<ProviderAttempt>) -> ResolveFailure {
        self.failure(
            ErrorKind::AllSourcesExhausted,
            format!("all {providers} providers failed"),
            attempts,
        )
    }

    fn failure(
        &self,
        kind: ErrorKind,
        message: impl Into<String>,
        attempts: Vec<ProviderAttempt>,
    ) -> ResolveFailure {
        ResolveFailure {
            metric: self.definition.key.clone(),
            kind,
            message: message.into(),
            attempts,
        }
    }
}

fn trail(outcome: Result<Resolution, ChainExhausted>) -> Vec<ProviderAttempt> {
    match outcome {
        Ok(resolution) => resolution.attempts,
        Err(exhausted) => exhausted.attempts,
    }
}

fn check_denominator(
    combine: Combine,
    right: &Series,
    pair: AlignedPair,
) -> Result<AlignedPair, AlignError> {
    if combine == Combine::Ratio && pair.right == 0.0 {
        return Err(AlignError::ZeroDenominator {
            right: right.provider_id().to_string(),
            period: pair.period,
        });
    }
    Ok(pair)
}

fn leg(series: &Series, value: f64) -> LegValue {
    LegValue {
        value,
        unit: series.unit().to_string(),
        provider_id: series.provider_id().to_string(),
        latest_period: series.latest_valid().map(|(period, _)| period),
    }
}
