use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use clubmetrics_core::{AmenityId, EventId, MembershipEnrollmentId, YearMonth};

/// One recorded use of an amenity by a member (immutable fact).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEvent {
    pub event_id: EventId,
    pub membership_enrollment_id: MembershipEnrollmentId,
    pub amenity_id: AmenityId,
    pub usage_timestamp: DateTime<Utc>,
}

impl UsageEvent {
    pub fn new(
        membership_enrollment_id: MembershipEnrollmentId,
        amenity_id: AmenityId,
        usage_timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            membership_enrollment_id,
            amenity_id,
            usage_timestamp,
        }
    }

    /// Calendar date of the use (UTC).
    pub fn usage_date(&self) -> NaiveDate {
        self.usage_timestamp.date_naive()
    }

    /// Calendar month the use is aggregated into.
    pub fn period(&self) -> YearMonth {
        YearMonth::of_instant(self.usage_timestamp)
    }
}
