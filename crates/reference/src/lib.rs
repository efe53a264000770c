//! Reference Store boundary: amenity catalog, cost models, enrollments, calendar.
//!
//! Read-only to the engine. Cross-entity constraints (one cost model per amenity,
//! one active enrollment per member, ...) are owned by the upstream collaborator;
//! the engine only observes whether a lookup resolves.

pub mod amenity;
pub mod calendar;
pub mod in_memory;
pub mod membership;
pub mod store;

pub use amenity::{Amenity, AmenityCostModel, StoredActual};
pub use calendar::CalendarDimension;
pub use in_memory::{InMemoryReferenceStore, ReferenceSnapshot};
pub use membership::MembershipEnrollment;
pub use store::{ReferenceError, ReferenceStore};
