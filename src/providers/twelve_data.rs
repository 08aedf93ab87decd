//! Twelve Data real-time quote.

use async_trait::async_trait;
use serde_json::Value;

use crate::config::CredentialKind;
use crate::error::ProviderError;
use crate::model::{ObsValue, PeriodKey, Series};
use crate::providers::{endpoint, json_number, leading_date, FetchContext, Provider, RawPayload};

#[derive(Debug, Clone)]
pub struct TwelveDataQuote {
    pub id: String,
    pub symbol: String,
    pub unit: String,
    pub scale: f64,
}

#[async_trait]
impl Provider for TwelveDataQuote {
    fn id(&self) -> &str {
        &self.id
    }

    fn unit(&self) -> &str {
        &self.unit
    }

    async fn fetch(&self, ctx: &FetchContext) -> Result<RawPayload, ProviderError> {
        let key = ctx.credential(CredentialKind::TwelveData, &self.id)?;
        let mut url = endpoint(&ctx.endpoints.twelve_data, &["quote"])?;
        url.query_pairs_mut()
            .append_pair("symbol", &self.symbol)
            .append_pair("apikey", &key);

        let body = ctx.http.get_text(&self.id, url).await?;
        Ok(RawPayload::body(body, ctx.now()))
    }

    fn parse(&self, raw: RawPayload) -> Result<Series, ProviderError> {
        let fetched_at = raw.fetched_at;
        let body = raw.into_body(&self.id)?;
        let quote: Value = serde_json::from_str(&body)
            .map_err(|e| ProviderError::MalformedPayload(format!("{}: {e}", self.id)))?;

        // Rejections (bad symbol, exhausted credits) arrive as 200 with a status field.
        if quote.get("status").and_then(Value::as_str) == Some("error") {
            let message = quote
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("upstream error");
            return Err(ProviderError::Transport(format!(
                "{} rejected the request: {message}",
                self.id
            )));
        }

        let close = quote.get("close").ok_or_else(|| {
            ProviderError::MalformedPayload(format!("{}: quote has no close", self.id))
        })?;
        let close = json_number(close).ok_or_else(|| {
            ProviderError::NoValidObservation(format!("{}: close is not numeric", self.id))
        })?;

        let day = quote
            .get("datetime")
            .and_then(Value::as_str)
            .and_then(leading_date)
            .unwrap_or_else(|| fetched_at.date_naive());
        let change = quote.get("percent_change").and_then(json_number);

        Ok(Series::new(
            self.id.clone(),
            self.unit.clone(),
            [(PeriodKey::Day(day), ObsValue::from_f64(close * self.scale))],
        )
        .with_quoted_change(change))
    }
}
