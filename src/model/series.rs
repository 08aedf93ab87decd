//! Normalized observations and per-provider series.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::model::period::{Granularity, PeriodKey};

/// A sample value, or the upstream "no data for this period" marker.
///
/// `Missing` is distinct from zero and never takes part in arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObsValue {
    Value(f64),
    Missing,
}

impl ObsValue {
    /// Wrap a parsed number; non-finite numbers become `Missing`.
    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() {
            ObsValue::Value(value)
        } else {
            ObsValue::Missing
        }
    }

    pub fn as_value(&self) -> Option<f64> {
        match self {
            ObsValue::Value(v) => Some(*v),
            ObsValue::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, ObsValue::Missing)
    }
}

/// One normalized sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub period: PeriodKey,
    pub value: ObsValue,
    pub provider_id: String,
}

/// Observations from one provider for one metric.
///
/// Always ascending by period with at most one observation per period.
/// Gaps are allowed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    provider_id: String,
    unit: String,
    observations: Vec<Observation>,
    /// Percent change reported by the upstream itself (quote endpoints).
    quoted_change_percent: Option<f64>,
}

impl Series {
    /// Build a series from `(period, value)` pairs in any order.
    ///
    /// When the same period appears twice the later pair wins, so a
    /// revised vintage listed after the original replaces it.
    pub fn new(
        provider_id: impl Into<String>,
        unit: impl Into<String>,
        points: impl IntoIterator<Item = (PeriodKey, ObsValue)>,
    ) -> Self {
        let provider_id = provider_id.into();
        let by_period: BTreeMap<PeriodKey, ObsValue> = points.into_iter().collect();
        let observations = by_period
            .into_iter()
            .map(|(period, value)| Observation {
                period,
                value,
                provider_id: provider_id.clone(),
            })
            .collect();

        Self {
            provider_id,
            unit: unit.into(),
            observations,
            quoted_change_percent: None,
        }
    }

    pub fn with_quoted_change(mut self, change_percent: Option<f64>) -> Self {
        self.quoted_change_percent = change_percent.filter(|c| c.is_finite());
        self
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Coarsest granularity present in the series (`Day` when empty).
    pub fn granularity(&self) -> Granularity {
        self.observations
            .iter()
            .map(|o| o.period.granularity())
            .max()
            .unwrap_or(Granularity::Day)
    }

    /// Non-Missing observations, oldest first.
    pub fn valid(&self) -> impl DoubleEndedIterator<Item = (PeriodKey, f64)> + '_ {
        self.observations
            .iter()
            .filter_map(|o| o.value.as_value().map(|v| (o.period, v)))
    }

    /// Most recent non-Missing observation.
    pub fn latest_valid(&self) -> Option<(PeriodKey, f64)> {
        self.valid().next_back()
    }

    pub fn has_valid(&self) -> bool {
        self.latest_valid().is_some()
    }

    /// Percent change between the two most recent non-Missing observations,
    /// falling back to the upstream-quoted change.
    pub fn change_percent(&self) -> Option<f64> {
        let mut recent = self.valid().rev();
        let computed = match (recent.next(), recent.next()) {
            (Some((_, latest)), Some((_, prior))) if prior != 0.0 => {
                Some((latest - prior) / prior * 100.0)
            }
            _ => None,
        };
        computed.or(self.quoted_change_percent).map(round2)
    }
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
