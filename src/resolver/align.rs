//! Reconciling two independently sourced series onto one period.
//!
//! Joint alignment first reduces both series to a common granularity (the
//! coarsest of the target and the two native ones) by averaging valid
//! sub-period values. The aligned period is then the newest period of the
//! left series for which the right series also has a value.
//!
//! As-of alignment pairs the newest valid left observation with the newest
//! valid right observation whose period had begun by the end of the left
//! one. It suits a spot value measured against a slowly published
//! denominator. Nothing is interpolated in either mode.

use std::collections::BTreeMap;

use crate::error::AlignError;
use crate::model::{Granularity, PeriodKey, Series};

/// Values of both legs for the chosen period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignedPair {
    pub period: PeriodKey,
    pub left: f64,
    pub right: f64,
}

/// How two legs are matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Joint(Granularity),
    AsOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSeriesAligner {
    alignment: Alignment,
}

impl TimeSeriesAligner {
    pub fn new(target: Granularity) -> Self {
        Self {
            alignment: Alignment::Joint(target),
        }
    }

    pub fn as_of() -> Self {
        Self {
            alignment: Alignment::AsOf,
        }
    }

    /// Granularity of the period an aligned pair is reported at.
    pub fn effective_granularity(&self, left: &Series, right: &Series) -> Granularity {
        match self.alignment {
            Alignment::Joint(target) => target.max(left.granularity()).max(right.granularity()),
            Alignment::AsOf => left.granularity(),
        }
    }

    pub fn align(&self, left: &Series, right: &Series) -> Result<AlignedPair, AlignError> {
        let pair = match self.alignment {
            Alignment::Joint(_) => self.joint(left, right),
            Alignment::AsOf => as_of(left, right),
        };
        pair.ok_or_else(|| AlignError::NoOverlapPeriod {
            left: left.provider_id().to_string(),
            right: right.provider_id().to_string(),
        })
    }

    fn joint(&self, left: &Series, right: &Series) -> Option<AlignedPair> {
        let granularity = self.effective_granularity(left, right);
        let left_values = reduce(left, granularity);
        let right_values = reduce(right, granularity);

        left_values.iter().rev().find_map(|(period, &l)| {
            right_values.get(period).map(|&r| AlignedPair {
                period: *period,
                left: l,
                right: r,
            })
        })
    }
}

fn as_of(left: &Series, right: &Series) -> Option<AlignedPair> {
    let (period, l) = left.latest_valid()?;
    let cutoff = period.end_date();
    right
        .valid()
        .rev()
        .find(|(p, _)| p.start_date() <= cutoff)
        .map(|(_, r)| AlignedPair {
            period,
            left: l,
            right: r,
        })
}

/// One value per `granularity` period: the mean of that period's valid
/// observations. Periods without any valid observation are absent.
pub fn reduce(series: &Series, granularity: Granularity) -> BTreeMap<PeriodKey, f64> {
    let mut groups: BTreeMap<PeriodKey, (f64, u32)> = BTreeMap::new();
    for (period, value) in series.valid() {
        let Some(bucket) = period.coarsen(granularity) else {
            continue;
        };
        let entry = groups.entry(bucket).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }

    groups
        .into_iter()
        .map(|(period, (sum, count))| (period, sum / f64::from(count)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ObsValue;
    use chrono::NaiveDate;

    fn years(id: &str, points: &[(i32, Option<f64>)]) -> Series {
        Series::new(
            id,
            "USD bn",
            points.iter().map(|&(y, v)| {
                (
                    PeriodKey::Year(y),
                    v.map(ObsValue::Value).unwrap_or(ObsValue::Missing),
                )
            }),
        )
    }

    fn yearly() -> TimeSeriesAligner {
        TimeSeriesAligner::new(Granularity::Year)
    }

    #[test]
    fn test_latest_joint_period() {
        let left = years("cap", &[(2019, Some(30.0)), (2020, Some(35.0)), (2021, Some(43.0))]);
        let right = years("gdp", &[(2018, Some(20.0)), (2020, Some(21.0)), (2021, Some(23.0))]);

        let pair = yearly().align(&left, &right).unwrap();
        assert_eq!(
            pair,
            AlignedPair {
                period: PeriodKey::Year(2021),
                left: 43.0,
                right: 23.0
            }
        );
    }

    #[test]
    fn test_skips_left_only_period() {
        let left = years("cap", &[(2020, Some(35.0)), (2021, Some(43.0))]);
        let right = years("gdp", &[(2020, Some(21.0)), (2021, None)]);

        let pair = yearly().align(&left, &right).unwrap();
        assert_eq!(pair.period, PeriodKey::Year(2020));
        assert_eq!((pair.left, pair.right), (35.0, 21.0));
    }

    #[test]
    fn test_no_overlap() {
        let left = years("cap", &[(2021, Some(43.0))]);
        let right = years("gdp", &[(2019, Some(21.0))]);

        let err = yearly().align(&left, &right).unwrap_err();
        assert_eq!(
            err,
            AlignError::NoOverlapPeriod {
                left: "cap".into(),
                right: "gdp".into()
            }
        );
    }

    #[test]
    fn test_quarterly_reduction_ignores_missing() {
        let quarters = Series::new(
            "cap",
            "USD bn",
            [
                (PeriodKey::quarter(2021, 1).unwrap(), ObsValue::Value(10.0)),
                (PeriodKey::quarter(2021, 2).unwrap(), ObsValue::Missing),
                (PeriodKey::quarter(2021, 3).unwrap(), ObsValue::Value(12.0)),
                (PeriodKey::quarter(2021, 4).unwrap(), ObsValue::Missing),
                (PeriodKey::quarter(2022, 1).unwrap(), ObsValue::Missing),
            ],
        );

        let reduced = reduce(&quarters, Granularity::Year);
        assert_eq!(reduced.len(), 1);
        assert_eq!(reduced[&PeriodKey::Year(2021)], 11.0);
    }

    #[test]
    fn test_mixed_frequencies_align_on_coarsest() {
        let quarters = Series::new(
            "cap",
            "USD bn",
            [
                (PeriodKey::quarter(2022, 1).unwrap(), ObsValue::Value(40.0)),
                (PeriodKey::quarter(2022, 2).unwrap(), ObsValue::Value(44.0)),
                (PeriodKey::quarter(2023, 1).unwrap(), ObsValue::Value(50.0)),
            ],
        );
        let annual = years("gdp", &[(2022, Some(25.0))]);

        // Even with a daily target the annual leg forces yearly buckets.
        let aligner = TimeSeriesAligner::new(Granularity::Day);
        assert_eq!(aligner.effective_granularity(&quarters, &annual), Granularity::Year);
        let pair = aligner.align(&quarters, &annual).unwrap();
        assert_eq!(pair.period, PeriodKey::Year(2022));
        assert_eq!(pair.left, 42.0);
    }

    #[test]
    fn test_daily_alignment_uses_exact_days() {
        let day = |d: u32| PeriodKey::Day(NaiveDate::from_ymd_opt(2024, 1, d).unwrap());
        let ten = Series::new(
            "fred:DGS10",
            "%",
            [
                (day(4), ObsValue::Value(4.0)),
                (day(5), ObsValue::Value(4.05)),
            ],
        );
        let two = Series::new(
            "fred:DGS2",
            "%",
            [
                (day(4), ObsValue::Value(4.38)),
                (day(5), ObsValue::Missing),
            ],
        );

        let pair = TimeSeriesAligner::new(Granularity::Day).align(&ten, &two).unwrap();
        assert_eq!(pair.period, day(4));
        assert_eq!((pair.left, pair.right), (4.0, 4.38));
    }

    fn gdp_quarters(year: i32) -> Series {
        Series::new(
            "fred:GDP",
            "USD bn",
            (1..=4u8).map(|q| {
                (
                    PeriodKey::quarter(year, q).unwrap(),
                    ObsValue::Value(29_000.0 + f64::from(q) * 100.0),
                )
            }),
        )
    }

    #[test]
    fn test_spot_value_early_in_year_needs_as_of() {
        let spot = PeriodKey::Day(NaiveDate::from_ymd_opt(2026, 2, 10).unwrap());
        let cap = Series::new(
            "fmp:constituents(15)",
            "USD bn",
            [(spot, ObsValue::Value(60_000.0))],
        );
        let gdp = gdp_quarters(2025);

        assert!(matches!(
            yearly().align(&cap, &gdp),
            Err(AlignError::NoOverlapPeriod { .. })
        ));

        let aligner = TimeSeriesAligner::as_of();
        assert_eq!(aligner.effective_granularity(&cap, &gdp), Granularity::Day);
        let pair = aligner.align(&cap, &gdp).unwrap();
        assert_eq!(
            pair,
            AlignedPair {
                period: spot,
                left: 60_000.0,
                right: 29_400.0
            }
        );
    }

    #[test]
    fn test_as_of_ignores_periods_starting_later() {
        let cap = years("cap", &[(2023, Some(40.0)), (2024, None)]);
        let gdp = Series::new(
            "gdp",
            "USD bn",
            [
                (PeriodKey::quarter(2023, 4).unwrap(), ObsValue::Value(27.0)),
                (PeriodKey::quarter(2024, 1).unwrap(), ObsValue::Value(28.0)),
                (PeriodKey::quarter(2024, 2).unwrap(), ObsValue::Missing),
            ],
        );

        let pair = TimeSeriesAligner::as_of().align(&cap, &gdp).unwrap();
        assert_eq!(pair.period, PeriodKey::Year(2023));
        assert_eq!((pair.left, pair.right), (40.0, 27.0));
    }

    #[test]
    fn test_as_of_without_earlier_denominator() {
        let cap = years("cap", &[(2019, Some(30.0))]);
        let gdp = gdp_quarters(2020);

        let err = TimeSeriesAligner::as_of().align(&cap, &gdp).unwrap_err();
        assert_eq!(
            err,
            AlignError::NoOverlapPeriod {
                left: "cap".into(),
                right: "fred:GDP".into()
            }
        );
    }
}
