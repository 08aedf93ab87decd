//! Concurrent resolution of many metrics with per-key fault isolation.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::Instrument;
use uuid::Uuid;

use crate::cache::StalenessBoundedCache;
use crate::config::FeedConfig;
use crate::error::{ErrorPayload, ResolveFailure};
use crate::model::MetricResult;
use crate::providers::FetchContext;
use crate::resolver::fallback::FallbackResolver;
use crate::resolver::metric::{MetricDefinition, MetricResolver};

/// Per-key entry of an aggregation: a value or a structured error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricOutcome {
    Resolved(MetricResult),
    Failed(ErrorPayload),
}

impl MetricOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, MetricOutcome::Resolved(_))
    }
}

impl From<Result<MetricResult, ResolveFailure>> for MetricOutcome {
    fn from(result: Result<MetricResult, ResolveFailure>) -> Self {
        match result {
            Ok(value) => MetricOutcome::Resolved(value),
            Err(failure) => MetricOutcome::Failed(failure.into()),
        }
    }
}

pub struct Aggregator {
    resolvers: BTreeMap<String, Arc<MetricResolver>>,
    cache: StalenessBoundedCache,
}

impl Aggregator {
    pub fn new(
        resolvers: impl IntoIterator<Item = MetricResolver>,
        cache: StalenessBoundedCache,
    ) -> Self {
        let resolvers = resolvers
            .into_iter()
            .map(|r| (r.key().to_string(), Arc::new(r)))
            .collect();
        Self { resolvers, cache }
    }

    /// Wire every configured metric to one shared fetch context and cache.
    pub fn from_config(config: &FeedConfig, ctx: FetchContext) -> Self {
        let cache = StalenessBoundedCache::new(ctx.clock.clone());
        let fallback = Arc::new(FallbackResolver::new(
            ctx,
            Duration::from_secs(config.timeouts.attempt_secs),
        ));
        let default_ttl = Duration::from_secs(config.cache.default_ttl_secs);

        let resolvers = config.metrics.iter().map(|metric| {
            MetricResolver::new(
                MetricDefinition::from_config(metric, default_ttl),
                fallback.clone(),
                cache.clone(),
            )
        });
        Self::new(resolvers.collect::<Vec<_>>(), cache)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.resolvers.keys().map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.resolvers.contains_key(key)
    }

    pub fn cache(&self) -> &StalenessBoundedCache {
        &self.cache
    }

    /// Resolve a single metric on its own task; a panic becomes an
    /// `Internal` failure.
    pub async fn resolve(&self, key: &str) -> Result<MetricResult, ResolveFailure> {
        let Some(resolver) = self.resolvers.get(key) else {
            return Err(ResolveFailure::unknown_metric(key));
        };
        let request_id = Uuid::new_v4();
        let handle = spawn_resolution(resolver.clone(), request_id);
        settle(key, request_id, handle).await
    }

    /// Resolve every configured metric.
    pub async fn resolve_everything(&self) -> BTreeMap<String, MetricOutcome> {
        let keys: Vec<String> = self.resolvers.keys().cloned().collect();
        self.resolve_all(keys).await
    }

    /// Resolve `keys` concurrently, one task per key.
    ///
    /// Always returns an entry per distinct key. A failing, unknown or
    /// panicking metric yields an error entry and never affects siblings.
    pub async fn resolve_all<I, S>(&self, keys: I) -> BTreeMap<String, MetricOutcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let request_id = Uuid::new_v4();
        let mut outcomes = BTreeMap::new();
        let mut tasks = Vec::new();

        for key in keys.into_iter().map(Into::into) {
            if outcomes.contains_key(&key) || tasks.iter().any(|(k, _)| k == &key) {
                continue;
            }
            match self.resolvers.get(&key) {
                Some(resolver) => {
                    let handle = spawn_resolution(resolver.clone(), request_id);
                    tasks.push((key, handle));
                }
                None => {
                    let failure = ResolveFailure::unknown_metric(&key);
                    outcomes.insert(key, MetricOutcome::Failed(failure.into()));
                }
            }
        }

        tracing::debug!(%request_id, tasks = tasks.len(), "Aggregation started");

        for (key, handle) in tasks {
            let outcome = MetricOutcome::from(settle(&key, request_id, handle).await);
            outcomes.insert(key, outcome);
        }

        let resolved = outcomes.values().filter(|o| o.is_resolved()).count();
        tracing::info!(
            %request_id,
            resolved,
            failed = outcomes.len() - resolved,
            "Aggregation finished"
        );
        outcomes
    }
}

type ResolutionTask = JoinHandle<Result<MetricResult, ResolveFailure>>;

fn spawn_resolution(resolver: Arc<MetricResolver>, request_id: Uuid) -> ResolutionTask {
    let span = tracing::info_span!("aggregate", %request_id);
    tokio::spawn(async move { resolver.resolve().await }.instrument(span))
}

async fn settle(
    key: &str,
    request_id: Uuid,
    handle: ResolutionTask,
) -> Result<MetricResult, ResolveFailure> {
    match handle.await {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(%request_id, metric = %key, error = %e, "Resolution task failed");
            Err(ResolveFailure::internal(
                key,
                format!("resolution task failed: {e}"),
            ))
        }
    }
}
