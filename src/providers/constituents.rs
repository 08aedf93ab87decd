//! Market capitalisation summed over a basket of FMP company profiles.

use async_trait::async_trait;
use serde_json::Value;

use crate::config::CredentialKind;
use crate::error::ProviderError;
use crate::model::{ObsValue, PeriodKey, Series};
use crate::providers::{
    endpoint, json_number, FetchContext, PayloadContent, Provider, RawPayload,
};

#[derive(Debug, Clone)]
pub struct FmpConstituents {
    pub id: String,
    pub symbols: Vec<String>,
    pub unit: String,
    /// Applied to the raw USD sum (e.g. index-to-market multiplier / 1e9).
    pub scale: f64,
}

#[async_trait]
impl Provider for FmpConstituents {
    fn id(&self) -> &str {
        &self.id
    }

    fn unit(&self) -> &str {
        &self.unit
    }

    async fn fetch(&self, ctx: &FetchContext) -> Result<RawPayload, ProviderError> {
        let key = ctx.credential(CredentialKind::Fmp, &self.id)?;
        let id = self.id.as_str();
        let key = key.as_str();

        let responses = ctx
            .throttle
            .run(self.symbols.iter(), move |symbol| async move {
                let mut url = endpoint(&ctx.endpoints.fmp, &["profile", symbol.as_str()])?;
                url.query_pairs_mut().append_pair("apikey", key);
                let body = ctx.http.get_text(id, url).await?;
                Ok::<_, ProviderError>((symbol.clone(), body))
            })
            .await;

        let mut bodies = Vec::with_capacity(responses.len());
        for response in responses {
            match response {
                Ok(pair) => bodies.push(pair),
                Err(e) => tracing::warn!(provider = id, error = %e, "Skipping constituent"),
            }
        }

        if bodies.is_empty() {
            return Err(ProviderError::Transport(format!(
                "{id}: none of {} constituent profiles could be fetched",
                self.symbols.len()
            )));
        }

        Ok(RawPayload {
            content: PayloadContent::Batch(bodies),
            fetched_at: ctx.now(),
        })
    }

    fn parse(&self, raw: RawPayload) -> Result<Series, ProviderError> {
        let bodies = match raw.content {
            PayloadContent::Batch(bodies) => bodies,
            PayloadContent::Body(body) => vec![(self.id.clone(), body)],
        };

        let mut total = 0.0;
        let mut counted = 0usize;
        for (symbol, body) in &bodies {
            match market_cap(body) {
                Some(cap) if cap > 0.0 => {
                    total += cap;
                    counted += 1;
                }
                _ => tracing::debug!(
                    provider = %self.id,
                    symbol = %symbol,
                    "No market cap in profile"
                ),
            }
        }

        if counted == 0 {
            return Err(ProviderError::NoValidObservation(format!(
                "{}: no positive market cap among {} profiles",
                self.id,
                bodies.len()
            )));
        }
        tracing::debug!(
            provider = %self.id,
            counted,
            requested = self.symbols.len(),
            "Summed constituents"
        );

        Ok(Series::new(
            self.id.clone(),
            self.unit.clone(),
            [(
                PeriodKey::Day(raw.fetched_at.date_naive()),
                ObsValue::from_f64(total * self.scale),
            )],
        ))
    }
}

/// `mktCap` (or `marketCap`) of the first profile in an FMP profile array.
fn market_cap(body: &str) -> Option<f64> {
    let payload: Value = serde_json::from_str(body).ok()?;
    let profile = match &payload {
        Value::Array(items) => items.first()?,
        other => other,
    };
    profile
        .get("mktCap")
        .or_else(|| profile.get("marketCap"))
        .and_then(json_number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn basket() -> FmpConstituents {
        FmpConstituents {
            id: "fmp:constituents(3)".into(),
            symbols: vec!["AAPL".into(), "MSFT".into(), "NVDA".into()],
            unit: "USD bn".into(),
            scale: 1.3 / 1e9,
        }
    }

    #[test]
    fn test_sums_and_skips_bad_profiles() {
        let raw = RawPayload {
            content: PayloadContent::Batch(vec![
                ("AAPL".into(), r#"[{"symbol":"AAPL","mktCap":3000000000000}]"#.into()),
                ("MSFT".into(), r#"[{"symbol":"MSFT","marketCap":2000000000000}]"#.into()),
                ("NVDA".into(), r#"[]"#.into()),
            ]),
            fetched_at: Utc::now(),
        };
        let series = basket().parse(raw).unwrap();
        let (_, value) = series.latest_valid().unwrap();
        assert!((value - 6500.0).abs() < 1e-6);
    }

    #[test]
    fn test_no_caps_is_no_valid_observation() {
        let raw = RawPayload {
            content: PayloadContent::Batch(vec![("AAPL".into(), r#"[{"mktCap":0}]"#.into())]),
            fetched_at: Utc::now(),
        };
        let err = basket().parse(raw).unwrap_err();
        assert!(matches!(err, ProviderError::NoValidObservation(_)));
    }
}
