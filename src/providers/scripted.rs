//! In-memory provider with a preset outcome.
//!
//! Stands in for real upstreams in tests and offline runs. Counts how many
//! times it was fetched so callers can assert on chain order.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::ProviderError;
use crate::model::{ObsValue, PeriodKey, Series};
use crate::providers::{FetchContext, Provider, RawPayload};

#[derive(Debug)]
pub struct ScriptedProvider {
    id: String,
    unit: String,
    outcome: Result<Series, ProviderError>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    /// Succeeds with the given observations.
    pub fn series(
        id: &str,
        unit: &str,
        points: impl IntoIterator<Item = (PeriodKey, ObsValue)>,
    ) -> Self {
        Self::with_outcome(id, unit, Ok(Series::new(id, unit, points)))
    }

    /// Succeeds with one observation.
    pub fn value(id: &str, unit: &str, period: PeriodKey, value: f64) -> Self {
        Self::series(id, unit, [(period, ObsValue::Value(value))])
    }

    /// Fails every fetch with `error`.
    pub fn failing(id: &str, unit: &str, error: ProviderError) -> Self {
        Self::with_outcome(id, unit, Err(error))
    }

    fn with_outcome(id: &str, unit: &str, outcome: Result<Series, ProviderError>) -> Self {
        Self {
            id: id.to_string(),
            unit: unit.to_string(),
            outcome,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Sleep for `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn unit(&self) -> &str {
        &self.unit
    }

    async fn fetch(&self, ctx: &FetchContext) -> Result<RawPayload, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.outcome {
            Ok(_) => Ok(RawPayload::body(String::new(), ctx.now())),
            Err(e) => Err(e.clone()),
        }
    }

    fn parse(&self, _raw: RawPayload) -> Result<Series, ProviderError> {
        self.outcome.clone()
    }
}
