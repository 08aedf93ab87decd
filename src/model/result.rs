//! Resolved metric values and the attempt trail.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::ErrorKind;
use crate::model::period::PeriodKey;

/// A resolved, display-ready metric value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricResult {
    pub value: f64,
    pub unit: String,
    /// Reporting period the value describes, when known.
    pub as_of_period: Option<PeriodKey>,
    /// Provider (or providers) the value came from.
    pub source: String,
    pub computed_at: DateTime<Utc>,
    /// True for cache-sourced or otherwise non-primary values.
    pub degraded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<String>,
}

/// The two aligned legs behind a ratio or spread.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Components {
    pub left: LegValue,
    pub right: LegValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LegValue {
    /// Value at the aligned period.
    pub value: f64,
    pub unit: String,
    pub provider_id: String,
    /// Newest period this leg reports, which may be later than the aligned one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latest_period: Option<PeriodKey>,
}

/// Outcome of one provider try.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptOutcome {
    Success,
    Failure,
}

/// One entry of the diagnostic trail, in attempt order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderAttempt {
    pub provider_id: String,
    pub outcome: AttemptOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ErrorKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

impl ProviderAttempt {
    pub fn success(provider_id: &str, elapsed_ms: u64) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            outcome: AttemptOutcome::Success,
            kind: None,
            error: None,
            elapsed_ms,
        }
    }

    pub fn failure(provider_id: &str, kind: ErrorKind, error: String, elapsed_ms: u64) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            outcome: AttemptOutcome::Failure,
            kind: Some(kind),
            error: Some(error),
            elapsed_ms,
        }
    }
}
