//! Rows the engine owns: the monthly amenity summary and the member engagement
//! read model.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use clubmetrics_core::{
    AmenityId, CustomerId, MembershipEnrollmentId, MembershipId, PeriodKey, round_currency,
};

use crate::aggregator::PeriodAggregate;
use crate::classifier::{Labels, UsageStatus};
use crate::estimator::CostEstimate;

/// Natural key of a [`MonthlySummary`].
pub type SummaryKey = PeriodKey<AmenityId>;

/// Natural key of a [`UsageEngagement`] row.
pub type EngagementKey = PeriodKey<MembershipEnrollmentId>;

/// Provenance of a reported money value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    Actual,
    Estimated,
}

/// One row per `(amenity_id, year, month)`; recomputed in place on every run.
///
/// Contains no run metadata (timestamps, run ids) so that recomputing the same
/// inputs yields an identical row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub amenity_id: AmenityId,
    pub year: i32,
    pub month: u32,
    pub month_start_date: NaiveDate,
    pub total_usage_count: u64,
    pub unique_member_count: u64,
    pub total_operating_cost: Decimal,
    pub total_member_spend: Decimal,
    pub total_revenue: Decimal,
    /// `None` when the period had no usage.
    pub operating_cost_per_use: Option<Decimal>,
    pub operating_cost_source: ValueSource,
    pub member_spend_source: ValueSource,
    pub usage_status: UsageStatus,
    pub watchlist: bool,
    pub first_use: Option<DateTime<Utc>>,
    pub last_use: Option<DateTime<Utc>>,
}

impl MonthlySummary {
    /// Assemble a summary row from the pipeline stages for one period.
    pub fn build(
        aggregate: &PeriodAggregate,
        estimate: &CostEstimate,
        labels: &Labels,
        total_revenue: Decimal,
    ) -> Self {
        let key = aggregate.key;
        Self {
            amenity_id: key.entity_id,
            year: key.year,
            month: key.month,
            month_start_date: aggregate.month_start_date(),
            total_usage_count: aggregate.total_usage_count,
            unique_member_count: aggregate.unique_member_count,
            total_operating_cost: round_currency(estimate.operating_cost.value()),
            total_member_spend: round_currency(estimate.member_spend.value()),
            total_revenue: round_currency(total_revenue),
            operating_cost_per_use: estimate.operating_cost_per_use,
            operating_cost_source: estimate.operating_cost.source(),
            member_spend_source: estimate.member_spend.source(),
            usage_status: labels.usage_status,
            watchlist: labels.watchlist,
            first_use: aggregate.first_use,
            last_use: aggregate.last_use,
        }
    }

    pub fn key(&self) -> SummaryKey {
        PeriodKey {
            entity_id: self.amenity_id,
            year: self.year,
            month: self.month,
        }
    }
}

/// Member-month engagement, fully derivable from usage events + reference data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEngagement {
    pub membership_enrollment_id: MembershipEnrollmentId,
    pub customer_id: CustomerId,
    pub membership_id: MembershipId,
    pub year: i32,
    pub month: u32,
    pub month_start_date: NaiveDate,
    pub usage_count: u64,
    pub distinct_amenities_used: u64,
    pub first_use: DateTime<Utc>,
    pub last_use: DateTime<Utc>,
}

impl UsageEngagement {
    pub fn key(&self) -> EngagementKey {
        PeriodKey {
            entity_id: self.membership_enrollment_id,
            year: self.year,
            month: self.month,
        }
    }
}
