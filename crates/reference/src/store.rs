use chrono::NaiveDate;
use std::sync::Arc;
use thiserror::Error;

use clubmetrics_core::{AmenityId, MembershipEnrollmentId, PeriodKey};

use crate::{Amenity, AmenityCostModel, MembershipEnrollment, StoredActual};

/// Reference store read failure.
///
/// A failed lookup is a batch-level failure. An entity that simply does not exist is
/// **not** an error here: lookups return `Ok(None)` and the engine decides.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("reference store unavailable: {0}")]
    Unavailable(String),
}

/// Read interface over the amenity / membership reference catalog.
pub trait ReferenceStore: Send + Sync {
    fn amenity(&self, amenity_id: AmenityId) -> Result<Option<Amenity>, ReferenceError>;

    /// Every amenity in the catalog (active or not).
    fn amenities(&self) -> Result<Vec<Amenity>, ReferenceError>;

    fn cost_model(&self, amenity_id: AmenityId) -> Result<Option<AmenityCostModel>, ReferenceError>;

    fn enrollment(
        &self,
        enrollment_id: MembershipEnrollmentId,
    ) -> Result<Option<MembershipEnrollment>, ReferenceError>;

    /// Whether the date dimension has a row for `date`.
    fn has_calendar_date(&self, date: NaiveDate) -> Result<bool, ReferenceError>;

    /// Finance-recorded actuals for an amenity-month, if any were recorded.
    fn stored_actual(&self, _key: &PeriodKey<AmenityId>) -> Result<Option<StoredActual>, ReferenceError> {
        Ok(None)
    }
}

impl<S> ReferenceStore for Arc<S>
where
    S: ReferenceStore + ?Sized,
{
    fn amenity(&self, amenity_id: AmenityId) -> Result<Option<Amenity>, ReferenceError> {
        (**self).amenity(amenity_id)
    }

    fn amenities(&self) -> Result<Vec<Amenity>, ReferenceError> {
        (**self).amenities()
    }

    fn cost_model(&self, amenity_id: AmenityId) -> Result<Option<AmenityCostModel>, ReferenceError> {
        (**self).cost_model(amenity_id)
    }

    fn enrollment(
        &self,
        enrollment_id: MembershipEnrollmentId,
    ) -> Result<Option<MembershipEnrollment>, ReferenceError> {
        (**self).enrollment(enrollment_id)
    }

    fn has_calendar_date(&self, date: NaiveDate) -> Result<bool, ReferenceError> {
        (**self).has_calendar_date(date)
    }

    fn stored_actual(&self, key: &PeriodKey<AmenityId>) -> Result<Option<StoredActual>, ReferenceError> {
        (**self).stored_actual(key)
    }
}
