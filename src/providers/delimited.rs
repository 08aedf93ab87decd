//! Daily close history published as delimited text (CBOE, Stooq).

use async_trait::async_trait;
use chrono::NaiveDate;
use url::Url;

use crate::error::ProviderError;
use crate::model::{ObsValue, PeriodKey, Series};
use crate::providers::{FetchContext, Provider, RawPayload};

#[derive(Debug, Clone)]
pub struct DelimitedClose {
    pub id: String,
    pub url: String,
    pub unit: String,
    /// Zero-based; `None` means the last column of each row.
    pub close_column: Option<usize>,
    pub date_format: String,
}

#[async_trait]
impl Provider for DelimitedClose {
    fn id(&self) -> &str {
        &self.id
    }

    fn unit(&self) -> &str {
        &self.unit
    }

    async fn fetch(&self, ctx: &FetchContext) -> Result<RawPayload, ProviderError> {
        let url = Url::parse(&self.url).map_err(|e| {
            ProviderError::Configuration(format!("{}: invalid URL: {e}", self.id))
        })?;
        let body = ctx.http.get_text(&self.id, url).await?;
        Ok(RawPayload::body(body, ctx.now()))
    }

    fn parse(&self, raw: RawPayload) -> Result<Series, ProviderError> {
        let body = raw.into_body(&self.id)?;
        let trimmed = body.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("no data") {
            return Err(ProviderError::NoValidObservation(format!(
                "{} returned no data",
                self.id
            )));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(trimmed.as_bytes());

        let mut rows = 0usize;
        let mut points = Vec::new();
        for record in reader.records() {
            let record = record
                .map_err(|e| ProviderError::MalformedPayload(format!("{}: {e}", self.id)))?;
            rows += 1;

            let Some(date) = record
                .get(0)
                .and_then(|d| NaiveDate::parse_from_str(d, &self.date_format).ok())
            else {
                continue;
            };
            let column = self
                .close_column
                .unwrap_or_else(|| record.len().saturating_sub(1));
            let value = record
                .get(column)
                .and_then(|c| c.parse::<f64>().ok())
                .map(ObsValue::from_f64)
                .unwrap_or(ObsValue::Missing);
            points.push((PeriodKey::Day(date), value));
        }

        if rows == 0 {
            return Err(ProviderError::NoValidObservation(format!(
                "{} returned a header without rows",
                self.id
            )));
        }
        if points.is_empty() {
            return Err(ProviderError::MalformedPayload(format!(
                "{}: no row has a date in format {}",
                self.id, self.date_format
            )));
        }

        let series = Series::new(self.id.clone(), self.unit.clone(), points);
        if !series.has_valid() {
            return Err(ProviderError::NoValidObservation(format!(
                "{} has no numeric close",
                self.id
            )));
        }
        Ok(series)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn cboe() -> DelimitedClose {
        DelimitedClose {
            id: "cboe:VIX".into(),
            url: "https://cdn.cboe.com/api/global/us_indices/daily_prices/VIX_History.csv".into(),
            unit: "points".into(),
            close_column: None,
            date_format: "%m/%d/%Y".into(),
        }
    }

    fn stooq() -> DelimitedClose {
        DelimitedClose {
            id: "stooq:^vix".into(),
            url: "https://stooq.com/q/d/l/?s=%5Evix&i=d".into(),
            unit: "points".into(),
            close_column: Some(4),
            date_format: "%Y-%m-%d".into(),
        }
    }

    fn day(y: i32, m: u32, d: u32) -> PeriodKey {
        PeriodKey::Day(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_cboe_last_column() {
        let body = "DATE,OPEN,HIGH,LOW,CLOSE\n01/04/2024,14.10,14.50,13.60,14.13\n01/05/2024,14.00,14.20,13.30,13.35\n";
        let series = cboe().parse(RawPayload::body(body, Utc::now())).unwrap();
        assert_eq!(series.latest_valid(), Some((day(2024, 1, 5), 13.35)));
        assert_eq!(series.change_percent(), Some(-5.52));
    }

    #[test]
    fn test_stooq_close_column_and_bad_close() {
        let body = "Date,Open,High,Low,Close\n2024-01-04,14.1,14.5,13.6,14.13\n2024-01-05,14.0,14.2,13.3,-\n";
        let series = stooq().parse(RawPayload::body(body, Utc::now())).unwrap();
        assert!(series.observations()[1].value.is_missing());
        assert_eq!(series.latest_valid(), Some((day(2024, 1, 4), 14.13)));
    }

    #[test]
    fn test_no_data() {
        for body in ["No data", "Date,Open,High,Low,Close\n"] {
            let err = stooq().parse(RawPayload::body(body, Utc::now())).unwrap_err();
            assert!(matches!(err, ProviderError::NoValidObservation(_)), "{body}");
        }
    }

    #[test]
    fn test_wrong_date_format_is_malformed() {
        let body = "DATE,CLOSE\n2024-01-05,13.35\n";
        let err = cboe().parse(RawPayload::body(body, Utc::now())).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedPayload(_)));
    }
}
