//! Error taxonomy for metric resolution.

use serde::Serialize;
use std::time::Duration;
use thiserror::Error;

use crate::model::{PeriodKey, ProviderAttempt};

/// Serializable tag for every failure class a caller can observe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Transport,
    MalformedPayload,
    NoValidObservation,
    NoOverlapPeriod,
    AllSourcesExhausted,
    UnknownMetric,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Transport => "transport",
            ErrorKind::MalformedPayload => "malformed_payload",
            ErrorKind::NoValidObservation => "no_valid_observation",
            ErrorKind::NoOverlapPeriod => "no_overlap_period",
            ErrorKind::AllSourcesExhausted => "all_sources_exhausted",
            ErrorKind::UnknownMetric => "unknown_metric",
            ErrorKind::Internal => "internal",
        }
    }
}

/// Errors a single provider attempt can end with.
///
/// These never escape the fallback chain; they are recorded in the trail.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    /// A required credential or parameter is not configured.
    #[error("not configured: {0}")]
    Configuration(String),

    /// Network failure or non-success HTTP status.
    #[error("transport error: {0}")]
    Transport(String),

    /// The attempt exceeded its deadline.
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The payload does not have the expected shape.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// Well-formed payload without a usable numeric value.
    #[error("no valid observation: {0}")]
    NoValidObservation(String),
}

impl ProviderError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ProviderError::Configuration(_) => ErrorKind::Configuration,
            ProviderError::Transport(_) | ProviderError::Timeout(_) => ErrorKind::Transport,
            ProviderError::MalformedPayload(_) => ErrorKind::MalformedPayload,
            ProviderError::NoValidObservation(_) => ErrorKind::NoValidObservation,
        }
    }
}

/// Errors from reconciling two series onto one period.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AlignError {
    #[error("no period where both {left} and {right} report a value")]
    NoOverlapPeriod { left: String, right: String },

    #[error("{right} reports zero for {period}")]
    ZeroDenominator { right: String, period: PeriodKey },
}

impl AlignError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AlignError::NoOverlapPeriod { .. } => ErrorKind::NoOverlapPeriod,
            AlignError::ZeroDenominator { .. } => ErrorKind::NoValidObservation,
        }
    }
}

/// Terminal failure of one metric resolution.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("{metric}: {message}")]
pub struct ResolveFailure {
    pub metric: String,
    pub kind: ErrorKind,
    pub message: String,
    pub attempts: Vec<ProviderAttempt>,
}

impl ResolveFailure {
    pub fn unknown_metric(metric: &str) -> Self {
        Self {
            metric: metric.to_string(),
            kind: ErrorKind::UnknownMetric,
            message: format!("unknown metric '{metric}'"),
            attempts: Vec::new(),
        }
    }

    pub fn internal(metric: &str, message: impl Into<String>) -> Self {
        Self {
            metric: metric.to_string(),
            kind: ErrorKind::Internal,
            message: message.into(),
            attempts: Vec::new(),
        }
    }
}

/// Error entry returned in place of a `MetricResult`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorPayload {
    pub metric: String,
    pub error: String,
    pub kind: ErrorKind,
    pub attempts: Vec<ProviderAttempt>,
}

impl From<ResolveFailure> for ErrorPayload {
    fn from(failure: ResolveFailure) -> Self {
        Self {
            metric: failure.metric,
            error: failure.message,
            kind: failure.kind,
            attempts: failure.attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_kinds() {
        assert_eq!(
            ProviderError::Timeout(Duration::from_millis(1500)).kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            ProviderError::Configuration("FRED_KEY missing".into()).kind(),
            ErrorKind::Configuration
        );
    }

    #[test]
    fn test_error_display() {
        let err = ProviderError::Timeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "timed out after 1500ms");

        let err = AlignError::NoOverlapPeriod {
            left: "fred:NCBEILQ027S".into(),
            right: "fred:GDP".into(),
        };
        assert!(err.to_string().contains("fred:GDP"));
    }

    #[test]
    fn test_payload_keeps_trail() {
        let failure = ResolveFailure {
            metric: "gold".into(),
            kind: ErrorKind::AllSourcesExhausted,
            message: "all 1 sources failed".into(),
            attempts: vec![ProviderAttempt::failure(
                "fred:GOLDPMGBD228NLBM",
                ErrorKind::Transport,
                "HTTP 503".into(),
                12,
            )],
        };
        let payload = ErrorPayload::from(failure);
        assert_eq!(payload.kind, ErrorKind::AllSourcesExhausted);
        assert_eq!(payload.attempts.len(), 1);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["metric"], "gold");
        assert_eq!(json["kind"], "all_sources_exhausted");
        assert_eq!(json["attempts"][0]["outcome"], "failure");
    }
}
