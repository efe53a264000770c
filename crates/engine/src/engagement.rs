//! Member-month engagement rows.

use clubmetrics_reference::{ReferenceError, ReferenceStore};

use crate::aggregator::MemberPeriodAggregate;
use crate::error::{EntityKind, RejectReason};
use crate::summary::{EngagementKey, UsageEngagement};

/// Resolve member aggregates into engagement rows.
///
/// An enrollment that no longer resolves is returned as a rejection; the rows for
/// every other member are still produced.
pub fn build_engagement<R>(
    aggregates: &[MemberPeriodAggregate],
    reference: &R,
) -> Result<(Vec<UsageEngagement>, Vec<(EngagementKey, RejectReason)>), ReferenceError>
where
    R: ReferenceStore + ?Sized,
{
    let mut rows = Vec::with_capacity(aggregates.len());
    let mut rejected = Vec::new();

    for agg in aggregates {
        let Some(enrollment) = reference.enrollment(agg.key.entity_id)? else {
            rejected.push((
                agg.key,
                RejectReason::ReferenceNotFound {
                    entity: EntityKind::MembershipEnrollment,
                    id: agg.key.entity_id.to_string(),
                },
            ));
            continue;
        };

        let month_start_date = match agg.key.year_month() {
            Ok(ym) => ym.first_day(),
            Err(_) => chrono::NaiveDate::MIN,
        };

        rows.push(UsageEngagement {
            membership_enrollment_id: agg.key.entity_id,
            customer_id: enrollment.customer_id,
            membership_id: enrollment.membership_id,
            year: agg.key.year,
            month: agg.key.month,
            month_start_date,
            usage_count: agg.usage_count,
            distinct_amenities_used: agg.distinct_amenities_used,
            first_use: agg.first_use,
            last_use: agg.last_use,
        });
    }

    Ok((rows, rejected))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use clubmetrics_core::{CustomerId, MembershipEnrollmentId, MembershipId, PeriodKey};
    use clubmetrics_reference::{InMemoryReferenceStore, MembershipEnrollment};

    #[test]
    fn resolves_customer_and_membership() {
        let reference = InMemoryReferenceStore::new();
        let enrollment = MembershipEnrollment {
            membership_enrollment_id: MembershipEnrollmentId::new(),
            customer_id: CustomerId::new(),
            membership_id: MembershipId::new(),
        };
        reference.insert_enrollment(enrollment.clone());

        let at = Utc.with_ymd_and_hms(2026, 3, 4, 10, 0, 0).unwrap();
        let known = MemberPeriodAggregate {
            key: PeriodKey { entity_id: enrollment.membership_enrollment_id, year: 2026, month: 3 },
            usage_count: 4,
            distinct_amenities_used: 2,
            first_use: at,
            last_use: at,
        };
        let unknown = MemberPeriodAggregate {
            key: PeriodKey { entity_id: MembershipEnrollmentId::new(), year: 2026, month: 3 },
            ..known.clone()
        };

        let (rows, rejected) = build_engagement(&[known, unknown], &reference).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].customer_id, enrollment.customer_id);
        assert_eq!(rows[0].membership_id, enrollment.membership_id);
        assert_eq!(rows[0].month_start_date, chrono::NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        assert_eq!(rejected.len(), 1);
        assert!(matches!(
            rejected[0].1,
            RejectReason::ReferenceNotFound { entity: EntityKind::MembershipEnrollment, .. }
        ));
    }
}
