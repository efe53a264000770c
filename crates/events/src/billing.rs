use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use clubmetrics_core::{AmenityId, YearMonth};

/// One line of a member invoice.
///
/// `(invoice_number, line_number)` is the natural key; a corrected line replaces the
/// earlier version with the same key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingLine {
    pub invoice_number: String,
    pub line_number: u32,
    pub charge_type: String,
    pub amount_billed: Decimal,
    pub amount_paid: Decimal,
    pub is_voided: bool,
    pub billed_on: NaiveDate,
    /// Amenity the charge is attributable to, when it is an amenity charge.
    #[serde(default)]
    pub amenity_id: Option<AmenityId>,
}

impl BillingLine {
    pub fn key(&self) -> (String, u32) {
        (self.invoice_number.clone(), self.line_number)
    }

    /// Voided lines never count toward revenue.
    pub fn counts_toward_revenue(&self) -> bool {
        !self.is_voided
    }

    pub fn period(&self) -> YearMonth {
        YearMonth::of_date(self.billed_on)
    }
}
