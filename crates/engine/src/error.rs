//! Engine error taxonomy.
//!
//! Two levels:
//! - [`EngineError`] is **batch-level**: the run aborts and nothing is committed.
//! - [`RejectReason`] is **row-level**: the row is excluded and reported, the rest
//!   of the batch proceeds.
//!
//! A zero-usage period has no per-use cost. That is represented as `None` on the
//! metric, not as an error.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use clubmetrics_events::SourceError;
use clubmetrics_reference::ReferenceError;

use crate::store::StoreError;

/// Structural misalignment of an aggregate row's period key.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GrainViolation {
    #[error("month {month} is outside 1..=12")]
    MonthOutOfRange { month: u32 },

    #[error("month_start_date {found} is not the first day of {year:04}-{month:02}")]
    MisalignedMonthStart { year: i32, month: u32, found: NaiveDate },

    #[error("{count} rows share period key {key}")]
    DuplicateKey { key: String, count: usize },

    #[error("{field} is negative ({value})")]
    NegativeMeasure { field: String, value: Decimal },
}

/// Kind of reference entity a lookup failed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Amenity,
    MembershipEnrollment,
}

impl core::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            EntityKind::Amenity => f.write_str("amenity"),
            EntityKind::MembershipEnrollment => f.write_str("membership enrollment"),
        }
    }
}

/// Why a single row (event or period) was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum RejectReason {
    #[error("grain violation: {0}")]
    GrainViolation(GrainViolation),

    #[error("{entity} {id} not found in reference store")]
    ReferenceNotFound { entity: EntityKind, id: String },

    #[error("integrity violation: {0}")]
    IntegrityViolation(String),
}

impl From<GrainViolation> for RejectReason {
    fn from(value: GrainViolation) -> Self {
        Self::GrainViolation(value)
    }
}

/// Batch-level failure: the run is aborted before any write.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    /// Reading the stored rows or drawing a write version failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("invalid recompute request: {0}")]
    InvalidRequest(String),
}
