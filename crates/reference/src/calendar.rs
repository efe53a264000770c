use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date dimension coverage: the contiguous range of days that have calendar rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarDimension {
    pub first: NaiveDate,
    pub last: NaiveDate,
}

impl CalendarDimension {
    pub fn new(first: NaiveDate, last: NaiveDate) -> Self {
        Self { first, last }
    }

    pub fn covers(&self, date: NaiveDate) -> bool {
        date >= self.first && date <= self.last
    }
}
