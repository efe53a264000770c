use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use clubmetrics_core::{AmenityId, YearMonth};

use crate::{BillingLine, UsageEvent};

/// Date-range filter for source reads.
///
/// `from` is inclusive and `until` exclusive, so a run over whole months asks for
/// exactly the events of those months and nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventFilter {
    pub from: NaiveDate,
    pub until: NaiveDate,
    /// Restrict to a single amenity (optional).
    pub amenity_id: Option<AmenityId>,
}

impl EventFilter {
    /// Filter covering every day of `first..=last`.
    pub fn months(first: YearMonth, last: YearMonth) -> Self {
        Self {
            from: first.first_day(),
            until: last.succ().first_day(),
            amenity_id: None,
        }
    }

    pub fn with_amenity(mut self, amenity_id: AmenityId) -> Self {
        self.amenity_id = Some(amenity_id);
        self
    }

    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.from && date < self.until
    }

    pub fn matches_amenity(&self, amenity_id: Option<AmenityId>) -> bool {
        match self.amenity_id {
            None => true,
            Some(wanted) => amenity_id == Some(wanted),
        }
    }

    pub fn matches_usage(&self, event: &UsageEvent) -> bool {
        self.contains_date(event.usage_date()) && self.matches_amenity(Some(event.amenity_id))
    }

    pub fn matches_billing(&self, line: &BillingLine) -> bool {
        self.contains_date(line.billed_on) && self.matches_amenity(line.amenity_id)
    }
}

/// Event source read failure.
///
/// Any of these aborts the current recomputation run: the engine never commits a
/// partial view of the source.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SourceError {
    #[error("event source unavailable: {0}")]
    Unavailable(String),
}

impl SourceError {
    /// Whether retrying the read may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::Unavailable(_))
    }
}

/// Read interface over usage events and billing lines.
pub trait EventSource: Send + Sync {
    /// Usage events matching `filter`, in no particular order.
    fn usage_events(&self, filter: &EventFilter) -> Result<Vec<UsageEvent>, SourceError>;

    /// Billing lines matching `filter` (voided lines included; callers decide).
    fn billing_lines(&self, filter: &EventFilter) -> Result<Vec<BillingLine>, SourceError>;
}

impl<S> EventSource for Arc<S>
where
    S: EventSource + ?Sized,
{
    fn usage_events(&self, filter: &EventFilter) -> Result<Vec<UsageEvent>, SourceError> {
        (**self).usage_events(filter)
    }

    fn billing_lines(&self, filter: &EventFilter) -> Result<Vec<BillingLine>, SourceError> {
        (**self).billing_lines(filter)
    }
}
