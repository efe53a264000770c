//! Utilization labels derived from an aggregate and its cost estimate.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::aggregator::PeriodAggregate;
use crate::estimator::CostEstimate;

/// Classification thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierThresholds {
    /// Usage at or below this count is "Underutilized" (zero included).
    pub underuse_usage_ceiling: u64,
    /// Underutilized amenities costing at least this much go on the watchlist.
    pub underuse_cost_floor: Decimal,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            underuse_usage_ceiling: 10,
            underuse_cost_floor: Decimal::new(10000, 2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsageStatus {
    #[serde(rename = "In Use")]
    InUse,
    #[serde(rename = "Underutilized")]
    Underutilized,
}

impl core::fmt::Display for UsageStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            UsageStatus::InUse => f.write_str("In Use"),
            UsageStatus::Underutilized => f.write_str("Underutilized"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Labels {
    pub usage_status: UsageStatus,
    pub watchlist: bool,
}

pub fn classify(aggregate: &PeriodAggregate, estimate: &CostEstimate, thresholds: &ClassifierThresholds) -> Labels {
    let underused = aggregate.total_usage_count <= thresholds.underuse_usage_ceiling;
    let usage_status = if underused {
        UsageStatus::Underutilized
    } else {
        UsageStatus::InUse
    };
    let watchlist = underused && estimate.operating_cost.value() >= thresholds.underuse_cost_floor;

    Labels {
        usage_status,
        watchlist,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::estimator::Metric;
    use clubmetrics_core::{AmenityId, PeriodKey};
    use rust_decimal_macros::dec;

    fn agg(uses: u64) -> PeriodAggregate {
        PeriodAggregate {
            key: PeriodKey { entity_id: AmenityId::new(), year: 2026, month: 3 },
            total_usage_count: uses,
            unique_member_count: 0,
            first_use: None,
            last_use: None,
        }
    }

    fn cost(value: Decimal) -> CostEstimate {
        CostEstimate {
            operating_cost: Metric::Estimated(value),
            member_spend: Metric::Estimated(Decimal::ZERO),
            operating_cost_per_use: None,
        }
    }

    #[test]
    fn busy_amenity_is_in_use_and_not_watched() {
        let labels = classify(&agg(15), &cost(dec!(245.00)), &ClassifierThresholds::default());
        assert_eq!(labels.usage_status, UsageStatus::InUse);
        assert!(!labels.watchlist);
    }

    #[test]
    fn quiet_expensive_amenity_is_watched() {
        let labels = classify(&agg(5), &cost(dec!(215.00)), &ClassifierThresholds::default());
        assert_eq!(labels.usage_status, UsageStatus::Underutilized);
        assert!(labels.watchlist);
    }

    #[test]
    fn boundaries_are_inclusive() {
        let t = ClassifierThresholds::default();
        assert_eq!(classify(&agg(10), &cost(dec!(100.00)), &t), Labels {
            usage_status: UsageStatus::Underutilized,
            watchlist: true,
        });
        assert!(!classify(&agg(10), &cost(dec!(99.99)), &t).watchlist);
        assert_eq!(classify(&agg(11), &cost(dec!(500)), &t).usage_status, UsageStatus::InUse);
    }

    #[test]
    fn zero_usage_counts_as_underutilized() {
        let labels = classify(&agg(0), &cost(dec!(0)), &ClassifierThresholds::default());
        assert_eq!(labels.usage_status, UsageStatus::Underutilized);
        assert!(!labels.watchlist);
    }

    #[test]
    fn status_serializes_as_display_label() {
        assert_eq!(serde_json::to_string(&UsageStatus::InUse).unwrap(), "\"In Use\"");
        assert_eq!(UsageStatus::Underutilized.to_string(), "Underutilized");
    }
}
