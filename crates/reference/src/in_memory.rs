use std::collections::HashMap;
use std::sync::{RwLock, RwLockWriteGuard};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use clubmetrics_core::{AmenityId, MembershipEnrollmentId, PeriodKey};

use crate::store::{ReferenceError, ReferenceStore};
use crate::{Amenity, AmenityCostModel, CalendarDimension, MembershipEnrollment, StoredActual};

/// Serializable snapshot of a reference catalog (used to seed the in-memory store).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceSnapshot {
    #[serde(default)]
    pub amenities: Vec<Amenity>,
    #[serde(default)]
    pub cost_models: Vec<(AmenityId, AmenityCostModel)>,
    #[serde(default)]
    pub enrollments: Vec<MembershipEnrollment>,
    pub calendar: Option<CalendarDimension>,
    #[serde(default)]
    pub actuals: Vec<(PeriodKey<AmenityId>, StoredActual)>,
}

#[derive(Debug, Default)]
struct Catalog {
    amenities: HashMap<AmenityId, Amenity>,
    cost_models: HashMap<AmenityId, AmenityCostModel>,
    enrollments: HashMap<MembershipEnrollmentId, MembershipEnrollment>,
    calendar: Option<CalendarDimension>,
    actuals: HashMap<PeriodKey<AmenityId>, StoredActual>,
}

/// In-memory reference store for tests/dev and the batch CLI.
///
/// Without a calendar dimension every date is treated as missing, mirroring a
/// reference database whose date table has not been populated.
#[derive(Debug, Default)]
pub struct InMemoryReferenceStore {
    inner: RwLock<Catalog>,
}

fn poisoned() -> ReferenceError {
    ReferenceError::Unavailable("lock poisoned".to_string())
}

impl InMemoryReferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_snapshot(snapshot: ReferenceSnapshot) -> Self {
        let store = Self::new();
        {
            let mut c = store.catalog_mut();
            c.amenities = snapshot.amenities.into_iter().map(|a| (a.amenity_id, a)).collect();
            c.cost_models = snapshot.cost_models.into_iter().collect();
            c.enrollments = snapshot
                .enrollments
                .into_iter()
                .map(|e| (e.membership_enrollment_id, e))
                .collect();
            c.calendar = snapshot.calendar;
            c.actuals = snapshot.actuals.into_iter().collect();
        }
        store
    }

    /// Write access for seeding. A writer that panicked mid-update leaves whole
    /// entries behind, so the catalog is recovered instead of dropping the write.
    fn catalog_mut(&self) -> RwLockWriteGuard<'_, Catalog> {
        self.inner.write().unwrap_or_else(|p| p.into_inner())
    }

    pub fn insert_amenity(&self, amenity: Amenity) {
        self.catalog_mut().amenities.insert(amenity.amenity_id, amenity);
    }

    pub fn insert_cost_model(&self, amenity_id: AmenityId, model: AmenityCostModel) {
        self.catalog_mut().cost_models.insert(amenity_id, model);
    }

    pub fn insert_enrollment(&self, enrollment: MembershipEnrollment) {
        self.catalog_mut()
            .enrollments
            .insert(enrollment.membership_enrollment_id, enrollment);
    }

    pub fn set_calendar(&self, calendar: CalendarDimension) {
        self.catalog_mut().calendar = Some(calendar);
    }

    pub fn record_actual(&self, key: PeriodKey<AmenityId>, actual: StoredActual) {
        self.catalog_mut().actuals.insert(key, actual);
    }

    /// Drop an amenity from the catalog (its cost model and actuals stay).
    pub fn remove_amenity(&self, amenity_id: AmenityId) {
        self.catalog_mut().amenities.remove(&amenity_id);
    }
}

impl ReferenceStore for InMemoryReferenceStore {
    fn amenity(&self, amenity_id: AmenityId) -> Result<Option<Amenity>, ReferenceError> {
        let c = self.inner.read().map_err(|_| poisoned())?;
        Ok(c.amenities.get(&amenity_id).cloned())
    }

    fn amenities(&self) -> Result<Vec<Amenity>, ReferenceError> {
        let c = self.inner.read().map_err(|_| poisoned())?;
        let mut all: Vec<Amenity> = c.amenities.values().cloned().collect();
        all.sort_by_key(|a| a.amenity_id);
        Ok(all)
    }

    fn cost_model(&self, amenity_id: AmenityId) -> Result<Option<AmenityCostModel>, ReferenceError> {
        let c = self.inner.read().map_err(|_| poisoned())?;
        Ok(c.cost_models.get(&amenity_id).cloned())
    }

    fn enrollment(
        &self,
        enrollment_id: MembershipEnrollmentId,
    ) -> Result<Option<MembershipEnrollment>, ReferenceError> {
        let c = self.inner.read().map_err(|_| poisoned())?;
        Ok(c.enrollments.get(&enrollment_id).cloned())
    }

    fn has_calendar_date(&self, date: NaiveDate) -> Result<bool, ReferenceError> {
        let c = self.inner.read().map_err(|_| poisoned())?;
        Ok(c.calendar.is_some_and(|cal| cal.covers(date)))
    }

    fn stored_actual(&self, key: &PeriodKey<AmenityId>) -> Result<Option<StoredActual>, ReferenceError> {
        let c = self.inner.read().map_err(|_| poisoned())?;
        Ok(c.actuals.get(key).cloned())
    }
}
