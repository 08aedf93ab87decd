//! Financial Modeling Prep quote.

use async_trait::async_trait;
use chrono::DateTime;
use serde_json::Value;

use crate::config::CredentialKind;
use crate::error::ProviderError;
use crate::model::{ObsValue, PeriodKey, Series};
use crate::providers::{endpoint, json_number, FetchContext, Provider, RawPayload};

#[derive(Debug, Clone)]
pub struct FmpQuote {
    pub id: String,
    pub symbol: String,
    pub unit: String,
    pub scale: f64,
}

#[async_trait]
impl Provider for FmpQuote {
    fn id(&self) -> &str {
        &self.id
    }

    fn unit(&self) -> &str {
        &self.unit
    }

    async fn fetch(&self, ctx: &FetchContext) -> Result<RawPayload, ProviderError> {
        let key = ctx.credential(CredentialKind::Fmp, &self.id)?;
        let mut url = endpoint(&ctx.endpoints.fmp, &["quote", self.symbol.as_str()])?;
        url.query_pairs_mut().append_pair("apikey", &key);

        let body = ctx.http.get_text(&self.id, url).await?;
        Ok(RawPayload::body(body, ctx.now()))
    }

    fn parse(&self, raw: RawPayload) -> Result<Series, ProviderError> {
        let fetched_at = raw.fetched_at;
        let body = raw.into_body(&self.id)?;
        let payload: Value = serde_json::from_str(&body)
            .map_err(|e| ProviderError::MalformedPayload(format!("{}: {e}", self.id)))?;

        if let Some(message) = payload.get("Error Message").and_then(Value::as_str) {
            return Err(ProviderError::Transport(format!(
                "{} rejected the request: {message}",
                self.id
            )));
        }

        let quote = payload
            .as_array()
            .and_then(|quotes| quotes.first())
            .ok_or_else(|| {
                ProviderError::MalformedPayload(format!("{}: expected a non-empty array", self.id))
            })?;

        let price = quote.get("price").and_then(json_number).ok_or_else(|| {
            ProviderError::NoValidObservation(format!("{}: price is null", self.id))
        })?;

        let day = quote
            .get("timestamp")
            .and_then(Value::as_i64)
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .unwrap_or(fetched_at)
            .date_naive();
        let change = quote.get("changesPercentage").and_then(json_number);

        Ok(Series::new(
            self.id.clone(),
            self.unit.clone(),
            [(PeriodKey::Day(day), ObsValue::from_f64(price * self.scale))],
        )
        .with_quoted_change(change))
    }
}
