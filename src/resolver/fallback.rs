//! Ordered provider fallback.
//!
//! Providers are tried strictly in chain order, one at a time. The first
//! attempt that yields a series with at least one valid value wins; every
//! attempt before it is recorded in the trail.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::clock::Clock;
use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::model::{ProviderAttempt, Series};
use crate::observability::metrics;
use crate::providers::{build_provider, FetchContext, Provider};
use crate::resilience::timeouts::with_deadline;

/// Immutable, priority-ordered list of providers for one series.
#[derive(Clone)]
pub struct FallbackChain {
    providers: Vec<Arc<dyn Provider>>,
}

impl FallbackChain {
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self { providers }
    }

    pub fn from_config(configs: &[ProviderConfig]) -> Self {
        Self::new(configs.iter().map(build_provider).collect())
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.id()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Provider>> {
        self.providers.iter()
    }
}

impl std::fmt::Debug for FallbackChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.ids()).finish()
    }
}

/// A winning series and the attempts it took to get it.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub series: Series,
    pub attempts: Vec<ProviderAttempt>,
}

/// Every provider failed; one attempt per provider, in order.
#[derive(Debug, Clone)]
pub struct ChainExhausted {
    pub attempts: Vec<ProviderAttempt>,
}

pub struct FallbackResolver {
    ctx: FetchContext,
    attempt_timeout: Duration,
}

impl FallbackResolver {
    pub fn new(ctx: FetchContext, attempt_timeout: Duration) -> Self {
        Self {
            ctx,
            attempt_timeout,
        }
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        self.ctx.clock.clone()
    }

    pub async fn resolve(&self, chain: &FallbackChain) -> Result<Resolution, ChainExhausted> {
        let mut attempts = Vec::with_capacity(chain.len());

        for (idx, provider) in chain.iter().enumerate() {
            tracing::debug!(provider = provider.id(), attempt = idx, "Trying provider");
            let started = Instant::now();
            let outcome =
                with_deadline(self.attempt_timeout, self.attempt(provider.as_ref())).await;
            let elapsed = started.elapsed();
            let elapsed_ms = elapsed.as_millis() as u64;
            metrics::record_provider_attempt(provider.id(), outcome.is_ok(), elapsed);

            match outcome {
                Ok(series) => {
                    tracing::debug!(provider = provider.id(), elapsed_ms, "Provider resolved");
                    attempts.push(ProviderAttempt::success(provider.id(), elapsed_ms));
                    return Ok(Resolution { series, attempts });
                }
                Err(e) => {
                    tracing::warn!(
                        provider = provider.id(),
                        attempt = idx,
                        kind = e.kind().as_str(),
                        error = %e,
                        elapsed_ms,
                        "Provider failed, trying next"
                    );
                    attempts.push(ProviderAttempt::failure(
                        provider.id(),
                        e.kind(),
                        e.to_string(),
                        elapsed_ms,
                    ));
                }
            }
        }

        tracing::warn!(providers = chain.len(), "Provider chain exhausted");
        Err(ChainExhausted { attempts })
    }

    async fn attempt(&self, provider: &dyn Provider) -> Result<Series, ProviderError> {
        let raw = provider.fetch(&self.ctx).await?;
        let series = provider.parse(raw)?;
        if series.unit() != provider.unit() {
            return Err(ProviderError::MalformedPayload(format!(
                "{} produced '{}' values but declares '{}'",
                provider.id(),
                series.unit(),
                provider.unit()
            )));
        }
        if !series.has_valid() {
            return Err(ProviderError::NoValidObservation(format!(
                "{} returned no numeric observation",
                provider.id()
            )));
        }
        Ok(series)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::config::{FeedConfig, StaticCredentials};
    use crate::error::ErrorKind;
    use crate::model::{AttemptOutcome, ObsValue, PeriodKey};
    use crate::providers::{RawPayload, ScriptedProvider};
    use async_trait::async_trait;

    pub(crate) fn test_context() -> FetchContext {
        FetchContext::from_config(
            &FeedConfig::default(),
            Arc::new(StaticCredentials::new()),
            Arc::new(SystemClock),
        )
        .unwrap()
    }

    pub(crate) fn chain_of(providers: &[Arc<ScriptedProvider>]) -> FallbackChain {
        FallbackChain::new(
            providers
                .iter()
                .map(|p| p.clone() as Arc<dyn Provider>)
                .collect(),
        )
    }

    fn resolver(timeout: Duration) -> FallbackResolver {
        FallbackResolver::new(test_context(), timeout)
    }

    fn down(id: &str) -> Arc<ScriptedProvider> {
        Arc::new(ScriptedProvider::failing(
            id,
            "USD/oz",
            ProviderError::Transport("HTTP 503".into()),
        ))
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let a = down("a");
        let b = down("b");
        let c = Arc::new(ScriptedProvider::value(
            "c",
            "USD/oz",
            PeriodKey::Year(2024),
            1923.4,
        ));
        let d = Arc::new(ScriptedProvider::value("d", "USD/oz", PeriodKey::Year(2024), 1.0));
        let chain = chain_of(&[a.clone(), b.clone(), c.clone(), d.clone()]);

        let resolution = resolver(Duration::from_secs(1)).resolve(&chain).await.unwrap();

        assert_eq!(resolution.series.provider_id(), "c");
        let trail: Vec<_> = resolution
            .attempts
            .iter()
            .map(|a| (a.provider_id.as_str(), a.outcome))
            .collect();
        assert_eq!(
            trail,
            vec![
                ("a", AttemptOutcome::Failure),
                ("b", AttemptOutcome::Failure),
                ("c", AttemptOutcome::Success)
            ]
        );
        assert_eq!((a.calls(), b.calls(), c.calls(), d.calls()), (1, 1, 1, 0));
    }

    #[tokio::test]
    async fn test_exhaustion_records_every_attempt() {
        let chain = chain_of(&[down("a"), down("b"), down("c")]);
        let exhausted = resolver(Duration::from_secs(1)).resolve(&chain).await.unwrap_err();
        assert_eq!(exhausted.attempts.len(), 3);
        assert!(exhausted
            .attempts
            .iter()
            .all(|a| a.kind == Some(ErrorKind::Transport)));
    }

    #[tokio::test]
    async fn test_timeout_moves_to_next_provider() {
        let slow = Arc::new(
            ScriptedProvider::value("slow", "points", PeriodKey::Year(2024), 99.0)
                .with_delay(Duration::from_secs(5)),
        );
        let fast = Arc::new(ScriptedProvider::value("fast", "points", PeriodKey::Year(2024), 14.0));
        let chain = chain_of(&[slow, fast]);

        let resolution = resolver(Duration::from_millis(50)).resolve(&chain).await.unwrap();
        assert_eq!(resolution.series.latest_valid().unwrap().1, 14.0);
        assert_eq!(resolution.attempts[0].kind, Some(ErrorKind::Transport));
        assert!(resolution.attempts[0]
            .error
            .as_deref()
            .unwrap()
            .contains("timed out"));
    }

    #[tokio::test]
    async fn test_all_missing_series_is_a_failure() {
        let empty = Arc::new(ScriptedProvider::series(
            "empty",
            "index",
            [(PeriodKey::Year(2024), ObsValue::Missing)],
        ));
        let chain = chain_of(&[empty]);
        let exhausted = resolver(Duration::from_secs(1)).resolve(&chain).await.unwrap_err();
        assert_eq!(exhausted.attempts[0].kind, Some(ErrorKind::NoValidObservation));
    }

    /// Declares billions but parses into plain dollars.
    struct Mislabelled;

    #[async_trait]
    impl Provider for Mislabelled {
        fn id(&self) -> &str {
            "mislabelled"
        }

        fn unit(&self) -> &str {
            "USD bn"
        }

        async fn fetch(&self, ctx: &FetchContext) -> Result<RawPayload, ProviderError> {
            Ok(RawPayload::body(String::new(), ctx.now()))
        }

        fn parse(&self, _raw: RawPayload) -> Result<Series, ProviderError> {
            Ok(Series::new(
                "mislabelled",
                "USD",
                [(PeriodKey::Year(2024), ObsValue::Value(43_000_000_000_000.0))],
            ))
        }
    }

    #[tokio::test]
    async fn test_unit_drift_falls_through() {
        let mislabelled: Arc<dyn Provider> = Arc::new(Mislabelled);
        let backup: Arc<dyn Provider> = Arc::new(ScriptedProvider::value(
            "backup",
            "USD bn",
            PeriodKey::Year(2024),
            43_000.0,
        ));
        let chain = FallbackChain::new(vec![mislabelled, backup]);

        let resolution = resolver(Duration::from_secs(1)).resolve(&chain).await.unwrap();
        assert_eq!(resolution.series.provider_id(), "backup");
        assert_eq!(resolution.attempts[0].kind, Some(ErrorKind::MalformedPayload));
        assert!(resolution.attempts[0]
            .error
            .as_deref()
            .unwrap()
            .contains("declares 'USD bn'"));
    }
}
