//! `clubmetrics-core`: shared primitives for the amenity rollup engine.
//!
//! This crate contains **pure** building blocks (no IO, no storage concerns):
//! identifiers, calendar periods, currency helpers and the domain error model.

pub mod error;
pub mod id;
pub mod money;
pub mod period;

pub use error::{DomainError, DomainResult};
pub use id::{AmenityId, CustomerId, EventId, MembershipEnrollmentId, MembershipId};
pub use money::round_currency;
pub use period::{PeriodKey, YearMonth};
