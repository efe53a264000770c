//! Cost/revenue estimation with field-by-field fallback to stored actuals.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use clubmetrics_core::{PeriodKey, round_currency};
use clubmetrics_events::BillingLine;
use clubmetrics_reference::{AmenityCostModel, StoredActual};

use crate::aggregator::PeriodAggregate;
use crate::summary::{SummaryKey, ValueSource};

/// A money value tagged with where it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "value", rename_all = "snake_case")]
pub enum Metric {
    Actual(Decimal),
    Estimated(Decimal),
}

impl Metric {
    pub fn value(&self) -> Decimal {
        match self {
            Metric::Actual(v) | Metric::Estimated(v) => *v,
        }
    }

    pub fn source(&self) -> ValueSource {
        match self {
            Metric::Actual(_) => ValueSource::Actual,
            Metric::Estimated(_) => ValueSource::Estimated,
        }
    }

    /// The stored actual if there is one, otherwise the lazily computed estimate.
    fn actual_or(actual: Option<Decimal>, estimate: impl FnOnce() -> Decimal) -> Self {
        match actual {
            Some(v) => Metric::Actual(v),
            None => Metric::Estimated(estimate()),
        }
    }
}

/// Estimated operating cost and member spend for one amenity-month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub operating_cost: Metric,
    pub member_spend: Metric,
    /// `operating_cost / total_usage_count`, rounded to cents; `None` with no usage.
    pub operating_cost_per_use: Option<Decimal>,
}

/// Apply the actual-if-present-else-estimate policy, one field at a time.
///
/// - operating cost: `monthly_fixed_cost + cost_per_use * uses`
/// - member spend: `member_cost_per_use * uses`, or zero when included in dues
/// - per-use cost: undefined (`None`) for a period without usage
pub fn estimate(
    aggregate: &PeriodAggregate,
    cost_model: &AmenityCostModel,
    stored_actual: Option<&StoredActual>,
) -> CostEstimate {
    let uses = Decimal::from(aggregate.total_usage_count);

    let operating_cost = Metric::actual_or(stored_actual.and_then(|a| a.operating_cost), || {
        cost_model.monthly_fixed_cost() + cost_model.cost_per_use() * uses
    });

    let member_spend = Metric::actual_or(stored_actual.and_then(|a| a.member_spend), || {
        if cost_model.in_dues_flag() {
            Decimal::ZERO
        } else {
            cost_model.member_cost_per_use() * uses
        }
    });

    let operating_cost_per_use = if aggregate.total_usage_count > 0 {
        Some(round_currency(operating_cost.value() / uses))
    } else {
        None
    };

    CostEstimate {
        operating_cost,
        member_spend,
        operating_cost_per_use,
    }
}

/// Paid amounts of non-voided, amenity-attributed billing lines per amenity-month.
pub fn attributed_revenue(lines: &[BillingLine]) -> BTreeMap<SummaryKey, Decimal> {
    let mut revenue: BTreeMap<SummaryKey, Decimal> = BTreeMap::new();
    for line in lines.iter().filter(|l| l.counts_toward_revenue()) {
        let Some(amenity_id) = line.amenity_id else {
            continue;
        };
        *revenue
            .entry(PeriodKey::new(amenity_id, line.period()))
            .or_insert(Decimal::ZERO) += line.amount_paid;
    }
    revenue
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use clubmetrics_core::AmenityId;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;

    fn aggregate_with(uses: u64) -> PeriodAggregate {
        PeriodAggregate {
            key: PeriodKey { entity_id: AmenityId::new(), year: 2026, month: 3 },
            total_usage_count: uses,
            unique_member_count: uses.min(10),
            first_use: None,
            last_use: None,
        }
    }

    fn pay_per_use() -> AmenityCostModel {
        AmenityCostModel::new(dec!(50000), dec!(200.00), dec!(3.00), false, dec!(4.00)).unwrap()
    }

    #[test]
    fn estimates_from_cost_model_without_actuals() {
        let e = estimate(&aggregate_with(15), &pay_per_use(), None);
        assert_eq!(e.operating_cost, Metric::Estimated(dec!(245.00)));
        assert_eq!(e.member_spend, Metric::Estimated(dec!(60.00)));
        assert_eq!(e.operating_cost_per_use, Some(dec!(16.33)));
    }

    #[test]
    fn in_dues_member_spend_is_zero() {
        let model = AmenityCostModel::new(dec!(0), dec!(80), dec!(1), true, dec!(0)).unwrap();
        for uses in [0, 1, 20, 5000] {
            let e = estimate(&aggregate_with(uses), &model, None);
            assert_eq!(e.member_spend.value(), Decimal::ZERO);
        }
    }

    #[test]
    fn member_spend_is_price_times_uses() {
        let model = AmenityCostModel::new(dec!(0), dec!(0), dec!(0), false, dec!(5.00)).unwrap();
        let e = estimate(&aggregate_with(20), &model, None);
        assert_eq!(e.member_spend.value(), dec!(100.00));
    }

    #[test]
    fn zero_usage_has_no_per_use_cost() {
        let e = estimate(&aggregate_with(0), &pay_per_use(), None);
        assert_eq!(e.operating_cost_per_use, None);
        assert_eq!(e.operating_cost.value(), dec!(200.00));
    }

    #[test]
    fn fallback_is_applied_per_field() {
        let actual = StoredActual {
            operating_cost: Some(dec!(300.00)),
            member_spend: None,
        };
        let e = estimate(&aggregate_with(15), &pay_per_use(), Some(&actual));
        assert_eq!(e.operating_cost, Metric::Actual(dec!(300.00)));
        assert_eq!(e.member_spend, Metric::Estimated(dec!(60.00)));
        assert_eq!(e.operating_cost_per_use, Some(dec!(20.00)));

        let actual = StoredActual {
            operating_cost: None,
            member_spend: Some(dec!(75.50)),
        };
        let e = estimate(&aggregate_with(15), &pay_per_use(), Some(&actual));
        assert_eq!(e.operating_cost.source(), ValueSource::Estimated);
        assert_eq!(e.member_spend, Metric::Actual(dec!(75.50)));
    }

    #[test]
    fn voided_and_unattributed_lines_do_not_count_as_revenue() {
        let amenity = AmenityId::new();
        let line = |n: u32, paid: Decimal, voided: bool, amenity_id: Option<AmenityId>| BillingLine {
            invoice_number: "INV-9".to_string(),
            line_number: n,
            charge_type: "court_fee".to_string(),
            amount_billed: paid,
            amount_paid: paid,
            is_voided: voided,
            billed_on: NaiveDate::from_ymd_opt(2026, 3, 14).unwrap(),
            amenity_id,
        };
        let revenue = attributed_revenue(&[
            line(1, dec!(20.00), false, Some(amenity)),
            line(2, dec!(15.00), true, Some(amenity)),
            line(3, dec!(99.00), false, None),
            line(4, dec!(5.25), false, Some(amenity)),
        ]);
        let key = PeriodKey { entity_id: amenity, year: 2026, month: 3 };
        assert_eq!(revenue.len(), 1);
        assert_eq!(revenue[&key], dec!(25.25));
    }

    proptest! {
        /// Property: estimation is deterministic for a given input triple.
        #[test]
        fn estimate_is_deterministic(uses in 0u64..10_000, fixed in 0i64..100_000, actual in proptest::option::of(0i64..100_000)) {
            let model = AmenityCostModel::new(Decimal::ZERO, Decimal::from(fixed), dec!(1.25), true, Decimal::ZERO).unwrap();
            let stored = actual.map(|a| StoredActual { operating_cost: Some(Decimal::from(a)), member_spend: None });
            let agg = aggregate_with(uses);
            let a = estimate(&agg, &model, stored.as_ref());
            let b = estimate(&agg, &model, stored.as_ref());
            prop_assert_eq!(&a, &b);
            prop_assert_eq!(a.operating_cost_per_use.is_none(), uses == 0);
        }
    }
}
