//! Usage aggregation per `(amenity, month)` and `(member, month)`.
//!
//! Aggregates are derived from scratch on every call: events are de-duplicated by
//! `event_id`, grouped in ordered maps and reduced once. Given the same event set
//! (in any order) and the same reference data, the output is identical.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use clubmetrics_core::{AmenityId, EventId, MembershipEnrollmentId, PeriodKey, YearMonth};
use clubmetrics_events::UsageEvent;
use clubmetrics_reference::{ReferenceError, ReferenceStore};

use crate::summary::{EngagementKey, SummaryKey};

/// Usage aggregate for one amenity-month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodAggregate {
    pub key: SummaryKey,
    pub total_usage_count: u64,
    pub unique_member_count: u64,
    pub first_use: Option<DateTime<Utc>>,
    pub last_use: Option<DateTime<Utc>>,
}

impl PeriodAggregate {
    /// Aggregate of a period with no recorded usage.
    pub fn idle(key: SummaryKey) -> Self {
        Self {
            key,
            total_usage_count: 0,
            unique_member_count: 0,
            first_use: None,
            last_use: None,
        }
    }

    /// First day of the aggregate's month (the grain validator re-checks this).
    pub fn month_start_date(&self) -> NaiveDate {
        match self.key.year_month() {
            Ok(ym) => ym.first_day(),
            Err(_) => NaiveDate::MIN,
        }
    }
}

/// Usage aggregate for one member-month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberPeriodAggregate {
    pub key: EngagementKey,
    pub usage_count: u64,
    pub distinct_amenities_used: u64,
    pub first_use: DateTime<Utc>,
    pub last_use: DateTime<Utc>,
}

/// Why an event was left out of aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum DataQualityIssue {
    /// The date dimension has no row for the event's date.
    MissingCalendarDate { date: NaiveDate },
    UnknownAmenity { amenity_id: AmenityId },
    UnknownEnrollment { membership_enrollment_id: MembershipEnrollmentId },
    /// The same `event_id` appeared more than once; it is counted once.
    DuplicateEvent,
}

/// Data-quality finding attached to a single event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataQualityWarning {
    pub event_id: EventId,
    #[serde(flatten)]
    pub issue: DataQualityIssue,
}

/// Output of one aggregation pass, ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationOutput {
    pub aggregates: Vec<PeriodAggregate>,
    pub member_aggregates: Vec<MemberPeriodAggregate>,
    pub warnings: Vec<DataQualityWarning>,
}

#[derive(Default)]
struct AmenityGroup {
    count: u64,
    members: BTreeSet<MembershipEnrollmentId>,
    first: Option<DateTime<Utc>>,
    last: Option<DateTime<Utc>>,
}

struct MemberGroup {
    count: u64,
    amenities: BTreeSet<AmenityId>,
    first: DateTime<Utc>,
    last: DateTime<Utc>,
}

/// Memoized reference lookups for one aggregation pass.
struct Resolver<'a, R: ?Sized> {
    reference: &'a R,
    dates: HashMap<NaiveDate, bool>,
    amenities: HashMap<AmenityId, bool>,
    enrollments: HashMap<MembershipEnrollmentId, bool>,
}

impl<'a, R: ReferenceStore + ?Sized> Resolver<'a, R> {
    fn new(reference: &'a R) -> Self {
        Self {
            reference,
            dates: HashMap::new(),
            amenities: HashMap::new(),
            enrollments: HashMap::new(),
        }
    }

    fn check(&mut self, event: &UsageEvent) -> Result<Option<DataQualityIssue>, ReferenceError> {
        let date = event.usage_date();
        let has_date = match self.dates.get(&date) {
            Some(known) => *known,
            None => {
                let known = self.reference.has_calendar_date(date)?;
                self.dates.insert(date, known);
                known
            }
        };
        if !has_date {
            return Ok(Some(DataQualityIssue::MissingCalendarDate { date }));
        }

        let amenity_id = event.amenity_id;
        let has_amenity = match self.amenities.get(&amenity_id) {
            Some(known) => *known,
            None => {
                let known = self.reference.amenity(amenity_id)?.is_some();
                self.amenities.insert(amenity_id, known);
                known
            }
        };
        if !has_amenity {
            return Ok(Some(DataQualityIssue::UnknownAmenity { amenity_id }));
        }

        let enrollment_id = event.membership_enrollment_id;
        let has_enrollment = match self.enrollments.get(&enrollment_id) {
            Some(known) => *known,
            None => {
                let known = self.reference.enrollment(enrollment_id)?.is_some();
                self.enrollments.insert(enrollment_id, known);
                known
            }
        };
        if !has_enrollment {
            return Ok(Some(DataQualityIssue::UnknownEnrollment {
                membership_enrollment_id: enrollment_id,
            }));
        }

        Ok(None)
    }
}

/// Aggregate `events` per amenity-month and member-month.
///
/// Events that fail a reference check are excluded and reported as warnings; only a
/// failing reference **store** is an error.
pub fn aggregate<R>(events: &[UsageEvent], reference: &R) -> Result<AggregationOutput, ReferenceError>
where
    R: ReferenceStore + ?Sized,
{
    let mut ordered: Vec<&UsageEvent> = events.iter().collect();
    ordered.sort_by(|a, b| {
        (a.event_id, a.usage_timestamp).cmp(&(b.event_id, b.usage_timestamp))
    });

    let mut resolver = Resolver::new(reference);
    let mut warnings = Vec::new();
    let mut by_amenity: BTreeMap<SummaryKey, AmenityGroup> = BTreeMap::new();
    let mut by_member: BTreeMap<EngagementKey, MemberGroup> = BTreeMap::new();
    let mut last_id: Option<EventId> = None;

    for event in ordered {
        if last_id == Some(event.event_id) {
            warnings.push(DataQualityWarning {
                event_id: event.event_id,
                issue: DataQualityIssue::DuplicateEvent,
            });
            continue;
        }
        last_id = Some(event.event_id);

        if let Some(issue) = resolver.check(event)? {
            tracing::warn!(event_id = %event.event_id, ?issue, "usage event excluded from aggregation");
            warnings.push(DataQualityWarning {
                event_id: event.event_id,
                issue,
            });
            continue;
        }

        let period: YearMonth = event.period();
        let at = event.usage_timestamp;

        let group = by_amenity
            .entry(PeriodKey::new(event.amenity_id, period))
            .or_default();
        group.count += 1;
        group.members.insert(event.membership_enrollment_id);
        group.first = Some(group.first.map_or(at, |f| f.min(at)));
        group.last = Some(group.last.map_or(at, |l| l.max(at)));

        by_member
            .entry(PeriodKey::new(event.membership_enrollment_id, period))
            .and_modify(|m| {
                m.count += 1;
                m.amenities.insert(event.amenity_id);
                m.first = m.first.min(at);
                m.last = m.last.max(at);
            })
            .or_insert_with(|| MemberGroup {
                count: 1,
                amenities: BTreeSet::from([event.amenity_id]),
                first: at,
                last: at,
            });
    }

    let aggregates = by_amenity
        .into_iter()
        .map(|(key, g)| PeriodAggregate {
            key,
            total_usage_count: g.count,
            unique_member_count: g.members.len() as u64,
            first_use: g.first,
            last_use: g.last,
        })
        .collect();

    let member_aggregates = by_member
        .into_iter()
        .map(|(key, g)| MemberPeriodAggregate {
            key,
            usage_count: g.count,
            distinct_amenities_used: g.amenities.len() as u64,
            first_use: g.first,
            last_use: g.last,
        })
        .collect();

    Ok(AggregationOutput {
        aggregates,
        member_aggregates,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use clubmetrics_core::{CustomerId, MembershipId};
    use clubmetrics_reference::{
        Amenity, CalendarDimension, InMemoryReferenceStore, MembershipEnrollment,
    };
    use proptest::prelude::*;

    struct Fixture {
        reference: InMemoryReferenceStore,
        amenities: Vec<AmenityId>,
        members: Vec<MembershipEnrollmentId>,
    }

    fn fixture(amenity_count: usize, member_count: usize) -> Fixture {
        let reference = InMemoryReferenceStore::new();
        reference.set_calendar(CalendarDimension::new(
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2027, 12, 31).unwrap(),
        ));
        let amenities: Vec<AmenityId> = (0..amenity_count)
            .map(|i| {
                let id = AmenityId::new();
                reference.insert_amenity(Amenity::new(id, format!("Amenity {i}"), "court"));
                id
            })
            .collect();
        let members: Vec<MembershipEnrollmentId> = (0..member_count)
            .map(|_| {
                let id = MembershipEnrollmentId::new();
                reference.insert_enrollment(MembershipEnrollment {
                    membership_enrollment_id: id,
                    customer_id: CustomerId::new(),
                    membership_id: MembershipId::new(),
                });
                id
            })
            .collect();
        Fixture {
            reference,
            amenities,
            members,
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn groups_by_amenity_and_calendar_month() {
        let f = fixture(2, 3);
        let (pool, court) = (f.amenities[0], f.amenities[1]);
        let events = vec![
            UsageEvent::new(f.members[0], pool, at(2026, 3, 1, 7)),
            UsageEvent::new(f.members[0], pool, at(2026, 3, 9, 7)),
            UsageEvent::new(f.members[1], pool, at(2026, 3, 31, 22)),
            UsageEvent::new(f.members[2], pool, at(2026, 4, 1, 6)),
            UsageEvent::new(f.members[2], court, at(2026, 3, 12, 18)),
        ];

        let out = aggregate(&events, &f.reference).unwrap();
        assert!(out.warnings.is_empty());
        assert_eq!(out.aggregates.len(), 3);

        let pool_march = out
            .aggregates
            .iter()
            .find(|a| a.key == PeriodKey { entity_id: pool, year: 2026, month: 3 })
            .unwrap();
        assert_eq!(pool_march.total_usage_count, 3);
        assert_eq!(pool_march.unique_member_count, 2);
        assert_eq!(pool_march.first_use, Some(at(2026, 3, 1, 7)));
        assert_eq!(pool_march.last_use, Some(at(2026, 3, 31, 22)));
        assert_eq!(pool_march.month_start_date(), NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
    }

    #[test]
    fn member_aggregates_count_distinct_amenities() {
        let f = fixture(2, 1);
        let events = vec![
            UsageEvent::new(f.members[0], f.amenities[0], at(2026, 3, 2, 9)),
            UsageEvent::new(f.members[0], f.amenities[0], at(2026, 3, 3, 9)),
            UsageEvent::new(f.members[0], f.amenities[1], at(2026, 3, 4, 9)),
        ];
        let out = aggregate(&events, &f.reference).unwrap();
        assert_eq!(out.member_aggregates.len(), 1);
        let m = &out.member_aggregates[0];
        assert_eq!(m.usage_count, 3);
        assert_eq!(m.distinct_amenities_used, 2);
        assert_eq!(m.first_use, at(2026, 3, 2, 9));
        assert_eq!(m.last_use, at(2026, 3, 4, 9));
    }

    #[test]
    fn missing_calendar_date_is_a_warning_not_an_error() {
        let f = fixture(1, 1);
        let outside = UsageEvent::new(f.members[0], f.amenities[0], at(2028, 1, 5, 9));
        let inside = UsageEvent::new(f.members[0], f.amenities[0], at(2026, 1, 5, 9));
        let out = aggregate(&[outside.clone(), inside], &f.reference).unwrap();

        assert_eq!(out.aggregates.len(), 1);
        assert_eq!(out.aggregates[0].total_usage_count, 1);
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].event_id, outside.event_id);
        assert!(matches!(out.warnings[0].issue, DataQualityIssue::MissingCalendarDate { .. }));
    }

    #[test]
    fn unknown_references_are_excluded() {
        let f = fixture(1, 1);
        let stranger = MembershipEnrollmentId::new();
        let ghost_amenity = AmenityId::new();
        let events = vec![
            UsageEvent::new(stranger, f.amenities[0], at(2026, 3, 2, 9)),
            UsageEvent::new(f.members[0], ghost_amenity, at(2026, 3, 2, 9)),
            UsageEvent::new(f.members[0], f.amenities[0], at(2026, 3, 2, 10)),
        ];
        let out = aggregate(&events, &f.reference).unwrap();
        assert_eq!(out.aggregates.len(), 1);
        assert_eq!(out.warnings.len(), 2);
        assert!(out.warnings.iter().any(|w| w.issue == DataQualityIssue::UnknownAmenity { amenity_id: ghost_amenity }));
        assert!(out.warnings.iter().any(|w| w.issue
            == DataQualityIssue::UnknownEnrollment { membership_enrollment_id: stranger }));
    }

    #[test]
    fn duplicate_event_ids_are_counted_once() {
        let f = fixture(1, 1);
        let e = UsageEvent::new(f.members[0], f.amenities[0], at(2026, 3, 2, 9));
        let out = aggregate(&[e.clone(), e.clone()], &f.reference).unwrap();
        assert_eq!(out.aggregates[0].total_usage_count, 1);
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].issue, DataQualityIssue::DuplicateEvent);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 128,
            ..ProptestConfig::default()
        })]

        /// Property: aggregation is idempotent and independent of event order.
        #[test]
        fn aggregation_is_order_independent_and_idempotent(
            picks in prop::collection::vec((0usize..3, 0usize..5, 0i64..(120 * 24)), 0..80),
            rotate in 0usize..80,
        ) {
            let f = fixture(3, 5);
            let base = at(2026, 1, 1, 0);
            let events: Vec<UsageEvent> = picks
                .iter()
                .map(|(a, m, hours)| UsageEvent::new(f.members[*m], f.amenities[*a], base + Duration::hours(*hours)))
                .collect();

            let first = aggregate(&events, &f.reference).unwrap();
            let second = aggregate(&events, &f.reference).unwrap();
            prop_assert_eq!(&first, &second);
            prop_assert_eq!(
                serde_json::to_vec(&first).unwrap(),
                serde_json::to_vec(&second).unwrap()
            );

            let mut shuffled = events.clone();
            shuffled.reverse();
            if !shuffled.is_empty() {
                let k = rotate % shuffled.len();
                shuffled.rotate_left(k);
            }
            let third = aggregate(&shuffled, &f.reference).unwrap();
            prop_assert_eq!(&first, &third);

            let total: u64 = first.aggregates.iter().map(|a| a.total_usage_count).sum();
            prop_assert_eq!(total, events.len() as u64);
            for a in &first.aggregates {
                prop_assert!(a.unique_member_count <= a.total_usage_count);
                prop_assert!(a.first_use <= a.last_use);
            }
        }
    }
}
