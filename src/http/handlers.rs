use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{ErrorPayload, ResolveFailure};
use crate::http::server::AppState;
use crate::resolver::MetricOutcome;

#[derive(Debug, Default, Deserialize)]
pub struct IndicatorQuery {
    /// Comma-separated metric keys; all metrics when absent.
    pub keys: Option<String>,
}

#[derive(Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub version: &'static str,
    pub metrics: usize,
    pub cached_fresh: usize,
    pub cached_stale: usize,
}

/// `GET /api/indicators`: every requested metric, failures included, always 200.
pub async fn get_indicators(
    State(state): State<AppState>,
    Query(query): Query<IndicatorQuery>,
) -> Json<BTreeMap<String, MetricOutcome>> {
    let keys: Vec<&str> = query
        .keys
        .as_deref()
        .map(|keys| {
            keys.split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let outcomes = if keys.is_empty() {
        state.aggregator.resolve_everything().await
    } else {
        state.aggregator.resolve_all(keys).await
    };
    Json(outcomes)
}

/// `GET /api/indicators/{key}`: one metric; 404 only for unknown keys.
pub async fn get_indicator(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    if !state.aggregator.contains(&key) {
        let payload = ErrorPayload::from(ResolveFailure::unknown_metric(&key));
        return (StatusCode::NOT_FOUND, Json(payload)).into_response();
    }

    let outcome = MetricOutcome::from(state.aggregator.resolve(&key).await);
    Json(outcome).into_response()
}

pub async fn get_health(State(state): State<AppState>) -> Json<HealthStatus> {
    let (cached_fresh, cached_stale) = state.aggregator.cache().summary();
    Json(HealthStatus {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        metrics: state.aggregator.keys().count(),
        cached_fresh,
        cached_stale,
    })
}
