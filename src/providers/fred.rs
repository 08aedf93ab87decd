//! FRED series observations.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;

use crate::config::{CredentialKind, FredFrequency};
use crate::error::ProviderError;
use crate::model::{Granularity, ObsValue, PeriodKey, Series};
use crate::providers::{endpoint, FetchContext, Provider, RawPayload};

/// FRED's marker for "no value for this date".
const MISSING_MARKER: &str = ".";

#[derive(Debug, Clone)]
pub struct FredProvider {
    pub id: String,
    pub series_id: String,
    pub unit: String,
    pub frequency: Option<FredFrequency>,
    pub observation_start: Option<String>,
    pub limit: Option<u32>,
    pub scale: f64,
}

#[derive(Debug, Deserialize)]
struct ObservationsResponse {
    observations: Option<Vec<RawObservation>>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawObservation {
    date: String,
    value: String,
}

impl FredProvider {
    fn granularity(&self) -> Granularity {
        match self.frequency {
            Some(FredFrequency::Annual) => Granularity::Year,
            Some(FredFrequency::Quarterly) => Granularity::Quarter,
            Some(FredFrequency::Monthly) => Granularity::Month,
            Some(FredFrequency::Daily) | None => Granularity::Day,
        }
    }
}

#[async_trait]
impl Provider for FredProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn unit(&self) -> &str {
        &self.unit
    }

    async fn fetch(&self, ctx: &FetchContext) -> Result<RawPayload, ProviderError> {
        let key = ctx.credential(CredentialKind::Fred, &self.id)?;
        let mut url = endpoint(&ctx.endpoints.fred, &["series", "observations"])?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("series_id", &self.series_id)
                .append_pair("api_key", &key)
                .append_pair("file_type", "json");
            if let Some(frequency) = self.frequency {
                query.append_pair("frequency", frequency.code());
            }
            if let Some(start) = &self.observation_start {
                query.append_pair("observation_start", start);
            }
            if let Some(limit) = self.limit {
                query
                    .append_pair("sort_order", "desc")
                    .append_pair("limit", &limit.to_string());
            }
        }

        let body = ctx.http.get_text(&self.id, url).await?;
        Ok(RawPayload::body(body, ctx.now()))
    }

    fn parse(&self, raw: RawPayload) -> Result<Series, ProviderError> {
        let body = raw.into_body(&self.id)?;
        let response: ObservationsResponse = serde_json::from_str(&body)
            .map_err(|e| ProviderError::MalformedPayload(format!("{}: {e}", self.id)))?;

        let observations = response.observations.ok_or_else(|| {
            let detail = response
                .error_message
                .unwrap_or_else(|| "no observations array".to_string());
            ProviderError::MalformedPayload(format!("{}: {detail}", self.id))
        })?;

        let granularity = self.granularity();
        let points: Vec<_> = observations
            .iter()
            .filter_map(|obs| {
                let date = NaiveDate::parse_from_str(&obs.date, "%Y-%m-%d").ok()?;
                let value = if obs.value.trim() == MISSING_MARKER {
                    ObsValue::Missing
                } else {
                    obs.value
                        .trim()
                        .parse::<f64>()
                        .map(|v| ObsValue::from_f64(v * self.scale))
                        .unwrap_or(ObsValue::Missing)
                };
                Some((PeriodKey::from_date(date, granularity), value))
            })
            .collect();

        if points.len() < observations.len() {
            tracing::debug!(
                provider = %self.id,
                skipped = observations.len() - points.len(),
                "Skipped observations with unparsable dates"
            );
        }

        let series = Series::new(self.id.clone(), self.unit.clone(), points);
        if !series.has_valid() {
            return Err(ProviderError::NoValidObservation(format!(
                "{} has no numeric observation",
                self.id
            )));
        }
        Ok(series)
    }
}
