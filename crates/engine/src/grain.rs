//! Grain validation: the single gate in front of every summary-store write.
//!
//! A row passes when its `(entity, year, month)` names a real calendar month, its
//! `month_start_date` is that month's first day, none of its measures are negative,
//! and no other row in the same batch carries the same key.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use clubmetrics_core::PeriodKey;
use clubmetrics_core::period::first_day;

use crate::error::GrainViolation;
use crate::summary::{MonthlySummary, UsageEngagement};

/// A row with a monthly grain.
pub trait GrainRow {
    type Entity: Copy + Ord + core::fmt::Display;

    fn period_key(&self) -> PeriodKey<Self::Entity>;

    fn month_start_date(&self) -> NaiveDate;

    /// Named count/cost fields that must be `>= 0`.
    fn measures(&self) -> Vec<(&'static str, Decimal)>;
}

impl GrainRow for MonthlySummary {
    type Entity = clubmetrics_core::AmenityId;

    fn period_key(&self) -> PeriodKey<Self::Entity> {
        self.key()
    }

    fn month_start_date(&self) -> NaiveDate {
        self.month_start_date
    }

    fn measures(&self) -> Vec<(&'static str, Decimal)> {
        let mut fields = vec![
            ("total_usage_count", Decimal::from(self.total_usage_count)),
            ("unique_member_count", Decimal::from(self.unique_member_count)),
            ("total_operating_cost", self.total_operating_cost),
            ("total_member_spend", self.total_member_spend),
            ("total_revenue", self.total_revenue),
        ];
        if let Some(per_use) = self.operating_cost_per_use {
            fields.push(("operating_cost_per_use", per_use));
        }
        fields
    }
}

impl GrainRow for UsageEngagement {
    type Entity = clubmetrics_core::MembershipEnrollmentId;

    fn period_key(&self) -> PeriodKey<Self::Entity> {
        self.key()
    }

    fn month_start_date(&self) -> NaiveDate {
        self.month_start_date
    }

    fn measures(&self) -> Vec<(&'static str, Decimal)> {
        vec![
            ("usage_count", Decimal::from(self.usage_count)),
            ("distinct_amenities_used", Decimal::from(self.distinct_amenities_used)),
        ]
    }
}

/// Result of validating a batch.
#[derive(Debug)]
pub struct GrainCheck<R: GrainRow> {
    pub accepted: Vec<R>,
    pub rejected: Vec<(PeriodKey<R::Entity>, GrainViolation)>,
}

/// Stateless grain validator.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrainValidator;

impl GrainValidator {
    /// Check a single row in isolation (month range, month start, non-negativity).
    pub fn validate_row<R: GrainRow>(row: &R) -> Result<(), GrainViolation> {
        let key = row.period_key();

        if !(1..=12).contains(&key.month) {
            return Err(GrainViolation::MonthOutOfRange { month: key.month });
        }

        let found = row.month_start_date();
        if first_day(key.year, key.month) != Some(found) {
            return Err(GrainViolation::MisalignedMonthStart {
                year: key.year,
                month: key.month,
                found,
            });
        }

        for (field, value) in row.measures() {
            if value < Decimal::ZERO {
                return Err(GrainViolation::NegativeMeasure {
                    field: field.to_string(),
                    value,
                });
            }
        }

        Ok(())
    }

    /// Check a candidate batch. Every row sharing a duplicated key is rejected:
    /// there is no way to tell which of them is the intended one.
    pub fn validate<R: GrainRow>(rows: Vec<R>) -> GrainCheck<R> {
        let mut per_key: BTreeMap<PeriodKey<R::Entity>, usize> = BTreeMap::new();
        for row in &rows {
            *per_key.entry(row.period_key()).or_insert(0) += 1;
        }

        let mut accepted = Vec::with_capacity(rows.len());
        let mut rejected = Vec::new();

        for row in rows {
            let key = row.period_key();
            let count = per_key.get(&key).copied().unwrap_or(0);
            if count > 1 {
                rejected.push((
                    key,
                    GrainViolation::DuplicateKey {
                        key: key.to_string(),
                        count,
                    },
                ));
                continue;
            }

            match Self::validate_row(&row) {
                Ok(()) => accepted.push(row),
                Err(violation) => rejected.push((key, violation)),
            }
        }

        GrainCheck { accepted, rejected }
    }
}
