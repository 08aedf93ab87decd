//! Upstream data providers.
//!
//! # Data Flow
//! ```text
//! ProviderConfig ─► build_provider ─► Arc<dyn Provider>
//!
//! Provider::fetch(ctx)  ── HttpFetcher (retries, backoff) ──► RawPayload
//! Provider::parse(raw)  ─────────────────────────────────────► Series
//! ```
//!
//! # Design Decisions
//! - Fetch and parse are split so payload handling is testable offline
//! - A provider's id and unit never change after construction
//! - Credentials are read per attempt; a missing key fails that provider only
//! - Everything a provider needs at fetch time lives in `FetchContext`

pub mod constituents;
pub mod delimited;
pub mod fmp;
pub mod fred;
pub mod http;
pub mod scripted;
pub mod twelve_data;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;
use std::sync::Arc;
use url::Url;

use crate::clock::Clock;
use crate::config::{
    CredentialKind, CredentialSource, EndpointConfig, FeedConfig, ProviderConfig,
};
use crate::error::ProviderError;
use crate::model::Series;
use crate::resilience::throttle::ThrottledBatch;

pub use self::http::HttpFetcher;
pub use scripted::ScriptedProvider;

/// Upstream response body, stamped with its arrival time.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPayload {
    pub content: PayloadContent,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PayloadContent {
    Body(String),
    /// One body per successfully fetched item, keyed by item.
    Batch(Vec<(String, String)>),
}

impl RawPayload {
    pub fn body(body: impl Into<String>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            content: PayloadContent::Body(body.into()),
            fetched_at,
        }
    }

    /// The single body, or a malformed-payload error for batch content.
    pub fn into_body(self, provider_id: &str) -> Result<String, ProviderError> {
        match self.content {
            PayloadContent::Body(body) => Ok(body),
            PayloadContent::Batch(_) => Err(ProviderError::MalformedPayload(format!(
                "{provider_id} expected a single body"
            ))),
        }
    }
}

/// Shared state handed to every fetch.
#[derive(Clone)]
pub struct FetchContext {
    pub http: HttpFetcher,
    pub credentials: Arc<dyn CredentialSource>,
    pub clock: Arc<dyn Clock>,
    pub throttle: ThrottledBatch,
    pub endpoints: EndpointConfig,
}

impl FetchContext {
    pub fn from_config(
        config: &FeedConfig,
        credentials: Arc<dyn CredentialSource>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, reqwest::Error> {
        Ok(Self {
            http: HttpFetcher::new(&config.timeouts, &config.retries)?,
            credentials,
            clock,
            throttle: ThrottledBatch::from_config(&config.throttle),
            endpoints: config.endpoints.clone(),
        })
    }

    /// The API key for `kind`, or a configuration error naming the provider.
    pub fn credential(
        &self,
        kind: CredentialKind,
        provider_id: &str,
    ) -> Result<String, ProviderError> {
        self.credentials.get(kind).ok_or_else(|| {
            ProviderError::Configuration(format!("no API key configured for {provider_id}"))
        })
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

/// One upstream source able to produce a `Series` in a fixed unit.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier, e.g. `fred:GDP`.
    fn id(&self) -> &str;

    /// Unit every value of the parsed series is expressed in.
    fn unit(&self) -> &str;

    async fn fetch(&self, ctx: &FetchContext) -> Result<RawPayload, ProviderError>;

    fn parse(&self, raw: RawPayload) -> Result<Series, ProviderError>;
}

/// Build the provider described by `config`.
pub fn build_provider(config: &ProviderConfig) -> Arc<dyn Provider> {
    match config {
        ProviderConfig::Fred {
            series_id,
            unit,
            frequency,
            observation_start,
            limit,
            scale,
        } => Arc::new(fred::FredProvider {
            id: format!("fred:{series_id}"),
            series_id: series_id.clone(),
            unit: unit.clone(),
            frequency: *frequency,
            observation_start: observation_start.clone(),
            limit: *limit,
            scale: *scale,
        }),
        ProviderConfig::TwelveData {
            symbol,
            unit,
            scale,
        } => Arc::new(twelve_data::TwelveDataQuote {
            id: format!("twelve_data:{symbol}"),
            symbol: symbol.clone(),
            unit: unit.clone(),
            scale: *scale,
        }),
        ProviderConfig::FmpQuote {
            symbol,
            unit,
            scale,
        } => Arc::new(fmp::FmpQuote {
            id: format!("fmp:{symbol}"),
            symbol: symbol.clone(),
            unit: unit.clone(),
            scale: *scale,
        }),
        ProviderConfig::FmpConstituents {
            symbols,
            unit,
            scale,
        } => Arc::new(constituents::FmpConstituents {
            id: format!("fmp:constituents({})", symbols.len()),
            symbols: symbols.clone(),
            unit: unit.clone(),
            scale: *scale,
        }),
        ProviderConfig::Csv {
            id,
            url,
            unit,
            close_column,
            date_format,
        } => Arc::new(delimited::DelimitedClose {
            id: id.clone(),
            url: url.clone(),
            unit: unit.clone(),
            close_column: *close_column,
            date_format: date_format.clone(),
        }),
    }
}

/// `base` with `segments` appended as percent-encoded path segments.
pub(crate) fn endpoint(base: &str, segments: &[&str]) -> Result<Url, ProviderError> {
    let mut url = Url::parse(base).map_err(|e| {
        ProviderError::Configuration(format!("invalid endpoint '{base}': {e}"))
    })?;
    url.path_segments_mut()
        .map_err(|_| ProviderError::Configuration(format!("'{base}' cannot be a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Numeric JSON field that upstreams send either as a number or a string.
pub(crate) fn json_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|v: &f64| v.is_finite())
}

/// Leading `YYYY-MM-DD` of a date or datetime string.
pub(crate) fn leading_date(text: &str) -> Option<NaiveDate> {
    text.get(..10)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::config::StaticCredentials;

    #[test]
    fn test_endpoint_encodes_segments() {
        let url = endpoint("https://financialmodelingprep.com/api/v3", &["quote", "^VIX"]).unwrap();
        assert_eq!(url.path(), "/api/v3/quote/%5EVIX");

        let url = endpoint("http://127.0.0.1:9000/", &["series", "observations"]).unwrap();
        assert_eq!(url.path(), "/series/observations");
    }

    #[test]
    fn test_json_number() {
        assert_eq!(json_number(&serde_json::json!("1923.40")), Some(1923.4));
        assert_eq!(json_number(&serde_json::json!(14.2)), Some(14.2));
        assert_eq!(json_number(&serde_json::json!(null)), None);
        assert_eq!(json_number(&serde_json::json!("n/a")), None);
    }

    #[test]
    fn test_leading_date() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 5);
        assert_eq!(leading_date("2024-01-05 15:59:00"), expected);
        assert_eq!(leading_date("2024-01-05"), expected);
        assert_eq!(leading_date("Jan 5"), None);
    }

    #[test]
    fn test_provider_ids() {
        let config = FeedConfig::default();
        let gold = config.metric("gold").unwrap();
        let ids: Vec<_> = gold
            .chain
            .iter()
            .map(|p| build_provider(p).id().to_string())
            .collect();
        assert_eq!(
            ids,
            vec![
                "fred:GOLDPMGBD228NLBM",
                "fred:GOLDAMGBD228NLBM",
                "twelve_data:XAU/USD",
                "fmp:GC=F"
            ]
        );
    }

    #[test]
    fn test_missing_credential() {
        let ctx = FetchContext::from_config(
            &FeedConfig::default(),
            Arc::new(StaticCredentials::new()),
            Arc::new(SystemClock),
        )
        .unwrap();
        let err = ctx.credential(CredentialKind::Fred, "fred:GDP").unwrap_err();
        assert_eq!(
            err,
            ProviderError::Configuration("no API key configured for fred:GDP".into())
        );
    }
}
