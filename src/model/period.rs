//! Calendar reporting periods.

use chrono::{Datelike, Months, NaiveDate};
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// Width of a reporting period, finest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Day,
    Month,
    Quarter,
    Year,
}

/// A calendar reporting period.
///
/// Periods order by their first calendar day; two periods starting on the
/// same day order finer-first (`2021-01-01` < `2021-01` < `2021-Q1` < `2021`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeriodKey {
    Year(i32),
    Quarter { year: i32, quarter: u8 },
    Month { year: i32, month: u8 },
    Day(NaiveDate),
}

impl PeriodKey {
    /// Quarter period, `None` unless `quarter` is 1..=4.
    pub fn quarter(year: i32, quarter: u8) -> Option<Self> {
        (1..=4)
            .contains(&quarter)
            .then_some(PeriodKey::Quarter { year, quarter })
    }

    /// Month period, `None` unless `month` is 1..=12.
    pub fn month(year: i32, month: u8) -> Option<Self> {
        (1..=12)
            .contains(&month)
            .then_some(PeriodKey::Month { year, month })
    }

    /// The period of the given width that contains `date`.
    pub fn from_date(date: NaiveDate, granularity: Granularity) -> Self {
        let year = date.year();
        match granularity {
            Granularity::Day => PeriodKey::Day(date),
            Granularity::Month => PeriodKey::Month {
                year,
                month: date.month() as u8,
            },
            Granularity::Quarter => PeriodKey::Quarter {
                year,
                quarter: ((date.month() - 1) / 3 + 1) as u8,
            },
            Granularity::Year => PeriodKey::Year(year),
        }
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            PeriodKey::Year(_) => Granularity::Year,
            PeriodKey::Quarter { .. } => Granularity::Quarter,
            PeriodKey::Month { .. } => Granularity::Month,
            PeriodKey::Day(_) => Granularity::Day,
        }
    }

    /// First calendar day covered by the period.
    pub fn start_date(&self) -> NaiveDate {
        let (year, month, day) = match *self {
            PeriodKey::Year(year) => (year, 1, 1),
            PeriodKey::Quarter { year, quarter } => {
                (year, (u32::from(quarter) * 3).saturating_sub(2), 1)
            }
            PeriodKey::Month { year, month } => (year, u32::from(month), 1),
            PeriodKey::Day(date) => return date,
        };
        NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MIN)
    }

    /// Last calendar day covered by the period.
    pub fn end_date(&self) -> NaiveDate {
        let months = match self.granularity() {
            Granularity::Day => return self.start_date(),
            Granularity::Month => 1,
            Granularity::Quarter => 3,
            Granularity::Year => 12,
        };
        self.start_date()
            .checked_add_months(Months::new(months))
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    /// The enclosing period at a coarser (or equal) granularity.
    ///
    /// Returns `None` when `target` is finer than this period.
    pub fn coarsen(&self, target: Granularity) -> Option<PeriodKey> {
        if target < self.granularity() {
            return None;
        }
        if target == self.granularity() {
            return Some(*self);
        }
        Some(PeriodKey::from_date(self.start_date(), target))
    }
}

impl Ord for PeriodKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.start_date()
            .cmp(&other.start_date())
            .then_with(|| self.granularity().cmp(&other.granularity()))
    }
}

impl PartialOrd for PeriodKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PeriodKey::Year(year) => write!(f, "{year}"),
            PeriodKey::Quarter { year, quarter } => write!(f, "{year}-Q{quarter}"),
            PeriodKey::Month { year, month } => write!(f, "{year}-{month:02}"),
            PeriodKey::Day(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

impl Serialize for PeriodKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
