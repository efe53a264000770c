//! Calendar-month periods and period keys.
//!
//! A [`YearMonth`] is always valid (month in `1..=12`). A [`PeriodKey`] keeps raw
//! `year`/`month` fields because it identifies rows that still have to pass grain
//! validation before they are written.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// A validated calendar month.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawYearMonth", into = "RawYearMonth")]
pub struct YearMonth {
    year: i32,
    month: u32,
}

#[derive(Serialize, Deserialize)]
struct RawYearMonth {
    year: i32,
    month: u32,
}

impl TryFrom<RawYearMonth> for YearMonth {
    type Error = DomainError;

    fn try_from(raw: RawYearMonth) -> Result<Self, Self::Error> {
        YearMonth::new(raw.year, raw.month)
    }
}

impl From<YearMonth> for RawYearMonth {
    fn from(value: YearMonth) -> Self {
        Self {
            year: value.year,
            month: value.month,
        }
    }
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> DomainResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(DomainError::validation(format!(
                "month must be in 1..=12 (got {month})"
            )));
        }
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(DomainError::validation(format!("year {year} is out of range")));
        }
        Ok(Self { year, month })
    }

    pub fn of_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Calendar month of a UTC instant.
    pub fn of_instant(at: DateTime<Utc>) -> Self {
        Self::of_date(at.date_naive())
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// First calendar day of the month.
    pub fn first_day(&self) -> NaiveDate {
        first_day(self.year, self.month).unwrap_or(NaiveDate::MIN)
    }

    /// The month immediately after this one.
    pub fn succ(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    /// Every month from `self` to `last`, inclusive. Empty when `last < self`.
    pub fn through(self, last: YearMonth) -> Vec<YearMonth> {
        let mut months = Vec::new();
        let mut cur = self;
        while cur <= last {
            months.push(cur);
            cur = cur.succ();
        }
        months
    }
}

impl core::fmt::Display for YearMonth {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// First calendar day of `(year, month)`, or `None` when the pair is not a real month.
pub fn first_day(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1)
}

/// `(entity_id, year, month)`: the natural key of one monthly aggregate row.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeriodKey<E> {
    pub entity_id: E,
    pub year: i32,
    pub month: u32,
}

impl<E> PeriodKey<E> {
    pub fn new(entity_id: E, period: YearMonth) -> Self {
        Self {
            entity_id,
            year: period.year(),
            month: period.month(),
        }
    }

    /// The validated month of this key, if the raw fields form one.
    pub fn year_month(&self) -> DomainResult<YearMonth> {
        YearMonth::new(self.year, self.month)
    }
}

impl<E: core::fmt::Display> core::fmt::Display for PeriodKey<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}@{:04}-{:02}", self.entity_id, self.year, self.month)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rejects_month_out_of_range() {
        assert!(YearMonth::new(2026, 0).is_err());
        assert!(YearMonth::new(2026, 13).is_err());
        assert!(YearMonth::new(2026, 12).is_ok());
    }

    #[test]
    fn december_rolls_into_january() {
        let dec = YearMonth::new(2025, 12).unwrap();
        assert_eq!(dec.succ(), YearMonth::new(2026, 1).unwrap());
    }

    #[test]
    fn through_is_inclusive_and_ordered() {
        let from = YearMonth::new(2025, 11).unwrap();
        let to = YearMonth::new(2026, 2).unwrap();
        let months: Vec<String> = from.through(to).iter().map(|m| m.to_string()).collect();
        assert_eq!(months, vec!["2025-11", "2025-12", "2026-01", "2026-02"]);
        assert!(to.through(from).is_empty());
    }

    #[test]
    fn deserialize_validates_month() {
        let bad = serde_json::from_str::<YearMonth>(r#"{"year":2026,"month":14}"#);
        assert!(bad.is_err());
        let good: YearMonth = serde_json::from_str(r#"{"year":2026,"month":3}"#).unwrap();
        assert_eq!(good.first_day(), NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
    }

    proptest! {
        /// Property: every date buckets into a month whose first day is on or before it.
        #[test]
        fn first_day_precedes_every_date_in_month(days in 0i64..100_000) {
            let date = NaiveDate::from_ymd_opt(1990, 1, 1).unwrap() + chrono::Duration::days(days);
            let ym = YearMonth::of_date(date);
            prop_assert!(ym.first_day() <= date);
            prop_assert_eq!(ym.first_day().day(), 1);
            prop_assert!(ym.succ().first_day() > date);
        }
    }
}
