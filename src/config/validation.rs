//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check chain integrity (every metric has a non-empty chain per leg)
//! - Check unit consistency inside a chain and across legs
//! - Validate value ranges (timeouts > 0, TTLs > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: FeedConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::{FeedConfig, MetricConfig, MetricKind, ProviderConfig};

/// One semantic problem, located by a dotted path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

pub fn validate_config(config: &FeedConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("'{}' is not a socket address", config.server.bind_address),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!(
                "'{}' is not a socket address",
                config.observability.metrics_address
            ),
        ));
    }

    for (field, value) in [
        ("server.request_timeout_secs", config.server.request_timeout_secs),
        ("timeouts.attempt_secs", config.timeouts.attempt_secs),
        ("timeouts.connect_secs", config.timeouts.connect_secs),
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("cache.default_ttl_secs", config.cache.default_ttl_secs),
    ] {
        if value == 0 {
            errors.push(ValidationError::new(field, "must be greater than zero"));
        }
    }
    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new(
            "retries.max_attempts",
            "must be at least 1",
        ));
    }
    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::new(
            "retries.base_delay_ms",
            "must not exceed retries.max_delay_ms",
        ));
    }
    if config.throttle.concurrency == 0 {
        errors.push(ValidationError::new(
            "throttle.concurrency",
            "must be greater than zero",
        ));
    }

    for (field, value) in [
        ("endpoints.fred", &config.endpoints.fred),
        ("endpoints.twelve_data", &config.endpoints.twelve_data),
        ("endpoints.fmp", &config.endpoints.fmp),
    ] {
        if Url::parse(value).is_err() {
            errors.push(ValidationError::new(field, format!("'{value}' is not a URL")));
        }
    }

    let mut seen = HashSet::new();
    for metric in &config.metrics {
        if metric.key.trim().is_empty() {
            errors.push(ValidationError::new("metrics.key", "must not be empty"));
        } else if !seen.insert(metric.key.as_str()) {
            errors.push(ValidationError::new(
                format!("metrics.{}", metric.key),
                "duplicate metric key",
            ));
        }
        validate_metric(metric, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_metric(metric: &MetricConfig, errors: &mut Vec<ValidationError>) {
    let base = format!("metrics.{}", metric.key);

    if metric.ttl_secs == Some(0) {
        errors.push(ValidationError::new(
            format!("{base}.ttl_secs"),
            "must be greater than zero",
        ));
    }

    if let Some(flag) = &metric.flag {
        if flag.above.is_none() && flag.below.is_none() {
            errors.push(ValidationError::new(
                format!("{base}.flag"),
                "needs 'above' or 'below'",
            ));
        }
    }

    match metric.kind {
        MetricKind::Simple => {
            if metric.chain.is_empty() {
                errors.push(ValidationError::new(
                    format!("{base}.chain"),
                    "simple metric needs at least one provider",
                ));
            }
            for provider in &metric.chain {
                if provider.unit() != metric.unit {
                    errors.push(ValidationError::new(
                        format!("{base}.chain"),
                        format!(
                            "provider unit '{}' differs from metric unit '{}'",
                            provider.unit(),
                            metric.unit
                        ),
                    ));
                }
            }
            validate_providers(&base, "chain", &metric.chain, errors);
        }
        MetricKind::Ratio | MetricKind::Spread => {
            if !metric.chain.is_empty() {
                errors.push(ValidationError::new(
                    format!("{base}.chain"),
                    "two-leg metrics use 'left' and 'right'",
                ));
            }
            for (leg, chain) in [("left", &metric.left), ("right", &metric.right)] {
                if chain.is_empty() {
                    errors.push(ValidationError::new(
                        format!("{base}.{leg}"),
                        "needs at least one provider",
                    ));
                }
                validate_providers(&base, leg, chain, errors);
            }
            // Both legs must be directly comparable.
            let units: HashSet<&str> = metric
                .left
                .iter()
                .chain(metric.right.iter())
                .map(|p| p.unit())
                .collect();
            if units.len() > 1 {
                let mut units: Vec<_> = units.into_iter().collect();
                units.sort_unstable();
                errors.push(ValidationError::new(
                    base.clone(),
                    format!("legs mix units: {}", units.join(", ")),
                ));
            }
        }
    }
}

fn validate_providers(
    base: &str,
    leg: &str,
    chain: &[ProviderConfig],
    errors: &mut Vec<ValidationError>,
) {
    for (idx, provider) in chain.iter().enumerate() {
        let field = format!("{base}.{leg}[{idx}]");
        match provider {
            ProviderConfig::Fred {
                series_id, scale, ..
            } => {
                if series_id.is_empty() {
                    errors.push(ValidationError::new(&field, "series_id must not be empty"));
                }
                check_scale(&field, *scale, errors);
            }
            ProviderConfig::TwelveData { symbol, scale, .. }
            | ProviderConfig::FmpQuote { symbol, scale, .. } => {
                if symbol.is_empty() {
                    errors.push(ValidationError::new(&field, "symbol must not be empty"));
                }
                check_scale(&field, *scale, errors);
            }
            ProviderConfig::FmpConstituents { symbols, scale, .. } => {
                if symbols.is_empty() {
                    errors.push(ValidationError::new(&field, "symbols must not be empty"));
                }
                check_scale(&field, *scale, errors);
            }
            ProviderConfig::Csv {
                id,
                url,
                date_format,
                ..
            } => {
                if id.is_empty() {
                    errors.push(ValidationError::new(&field, "id must not be empty"));
                }
                if Url::parse(url).is_err() {
                    errors.push(ValidationError::new(&field, format!("'{url}' is not a URL")));
                }
                if date_format.is_empty() {
                    errors.push(ValidationError::new(&field, "date_format must not be empty"));
                }
            }
        }
    }
}

fn check_scale(field: &str, scale: f64, errors: &mut Vec<ValidationError>) {
    if !scale.is_finite() || scale == 0.0 {
        errors.push(ValidationError::new(field, "scale must be finite and non-zero"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::FlagConfig;

    fn fred(series_id: &str, unit: &str) -> ProviderConfig {
        ProviderConfig::Fred {
            series_id: series_id.into(),
            unit: unit.into(),
            frequency: None,
            observation_start: None,
            limit: None,
            scale: 1.0,
        }
    }

    fn only(metrics: Vec<MetricConfig>) -> FeedConfig {
        FeedConfig {
            metrics,
            ..FeedConfig::default()
        }
    }

    fn ratio(left: Vec<ProviderConfig>, right: Vec<ProviderConfig>) -> MetricConfig {
        MetricConfig {
            key: "buffett".into(),
            unit: "%".into(),
            kind: MetricKind::Ratio,
            ttl_secs: None,
            align: crate::config::AlignTo::Year,
            chain: Vec::new(),
            left,
            right,
            flag: None,
        }
    }

    #[test]
    fn test_default_config_valid() {
        assert!(validate_config(&FeedConfig::default()).is_ok());
    }

    #[test]
    fn test_duplicate_keys() {
        let m = ratio(vec![fred("A", "USD bn")], vec![fred("B", "USD bn")]);
        let errors = validate_config(&only(vec![m.clone(), m])).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "duplicate metric key");
    }

    #[test]
    fn test_mixed_units_across_legs() {
        let m = ratio(vec![fred("A", "USD mn")], vec![fred("B", "USD bn")]);
        let errors = validate_config(&only(vec![m])).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("USD bn, USD mn"));
    }

    #[test]
    fn test_reports_every_error() {
        let mut m = ratio(Vec::new(), Vec::new());
        m.ttl_secs = Some(0);
        m.flag = Some(FlagConfig {
            label: "x".into(),
            above: None,
            below: None,
        });
        let mut config = only(vec![m]);
        config.throttle.concurrency = 0;
        config.endpoints.fmp = "not a url".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert!(fields.contains(&"throttle.concurrency"));
        assert!(fields.contains(&"endpoints.fmp"));
        assert!(fields.contains(&"metrics.buffett.ttl_secs"));
        assert!(fields.contains(&"metrics.buffett.flag"));
        assert!(fields.contains(&"metrics.buffett.left"));
        assert!(fields.contains(&"metrics.buffett.right"));
    }
}
