use std::collections::BTreeMap;
use std::sync::RwLock;

use clubmetrics_core::EventId;

use crate::source::{EventFilter, EventSource, SourceError};
use crate::{BillingLine, UsageEvent};

/// In-memory event source.
///
/// Intended for tests/dev and for the batch CLI. Usage events are keyed by
/// `event_id` and billing lines by `(invoice_number, line_number)`, so recording a
/// corrected row replaces the previous version instead of duplicating it.
#[derive(Debug, Default)]
pub struct InMemoryEventSource {
    usage: RwLock<BTreeMap<EventId, UsageEvent>>,
    billing: RwLock<BTreeMap<(String, u32), BillingLine>>,
}

impl InMemoryEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record usage events (new or corrected).
    pub fn record_usage(&self, events: impl IntoIterator<Item = UsageEvent>) -> Result<(), SourceError> {
        let mut usage = self
            .usage
            .write()
            .map_err(|_| SourceError::Unavailable("lock poisoned".to_string()))?;
        for event in events {
            if let Some(previous) = usage.insert(event.event_id, event) {
                tracing::debug!(event_id = %previous.event_id, "usage event corrected");
            }
        }
        Ok(())
    }

    /// Record billing lines (new or corrected).
    pub fn record_billing(&self, lines: impl IntoIterator<Item = BillingLine>) -> Result<(), SourceError> {
        let mut billing = self
            .billing
            .write()
            .map_err(|_| SourceError::Unavailable("lock poisoned".to_string()))?;
        for line in lines {
            billing.insert(line.key(), line);
        }
        Ok(())
    }

    pub fn usage_len(&self) -> usize {
        self.usage.read().map(|u| u.len()).unwrap_or(0)
    }
}

impl EventSource for InMemoryEventSource {
    fn usage_events(&self, filter: &EventFilter) -> Result<Vec<UsageEvent>, SourceError> {
        let usage = self
            .usage
            .read()
            .map_err(|_| SourceError::Unavailable("lock poisoned".to_string()))?;
        Ok(usage.values().filter(|e| filter.matches_usage(e)).cloned().collect())
    }

    fn billing_lines(&self, filter: &EventFilter) -> Result<Vec<BillingLine>, SourceError> {
        let billing = self
            .billing
            .read()
            .map_err(|_| SourceError::Unavailable("lock poisoned".to_string()))?;
        Ok(billing.values().filter(|l| filter.matches_billing(l)).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use clubmetrics_core::{AmenityId, MembershipEnrollmentId, YearMonth};
    use rust_decimal_macros::dec;

    fn march() -> EventFilter {
        let m = YearMonth::new(2026, 3).unwrap();
        EventFilter::months(m, m)
    }

    fn line(invoice: &str, n: u32, paid: rust_decimal::Decimal, day: u32) -> BillingLine {
        BillingLine {
            invoice_number: invoice.to_string(),
            line_number: n,
            charge_type: "guest_fee".to_string(),
            amount_billed: paid,
            amount_paid: paid,
            is_voided: false,
            billed_on: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
            amenity_id: None,
        }
    }

    #[test]
    fn filter_excludes_events_outside_the_month() {
        let source = InMemoryEventSource::new();
        let amenity = AmenityId::new();
        let member = MembershipEnrollmentId::new();
        source
            .record_usage(vec![
                UsageEvent::new(member, amenity, Utc.with_ymd_and_hms(2026, 2, 28, 23, 59, 59).unwrap()),
                UsageEvent::new(member, amenity, Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap()),
                UsageEvent::new(member, amenity, Utc.with_ymd_and_hms(2026, 3, 31, 23, 0, 0).unwrap()),
                UsageEvent::new(member, amenity, Utc.with_ymd_and_hms(2026, 4, 1, 0, 0, 0).unwrap()),
            ])
            .unwrap();

        let events = source.usage_events(&march()).unwrap();
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn amenity_filter_narrows_results() {
        let source = InMemoryEventSource::new();
        let pool = AmenityId::new();
        let spa = AmenityId::new();
        let member = MembershipEnrollmentId::new();
        let at = Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).unwrap();
        source
            .record_usage(vec![UsageEvent::new(member, pool, at), UsageEvent::new(member, spa, at)])
            .unwrap();

        let events = source.usage_events(&march().with_amenity(spa)).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].amenity_id, spa);
    }

    #[test]
    fn corrected_rows_replace_previous_versions() {
        let source = InMemoryEventSource::new();
        let member = MembershipEnrollmentId::new();
        let mut event = UsageEvent::new(member, AmenityId::new(), Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap());
        source.record_usage(vec![event.clone()]).unwrap();
        event.usage_timestamp = Utc.with_ymd_and_hms(2026, 3, 3, 8, 0, 0).unwrap();
        source.record_usage(vec![event.clone()]).unwrap();
        assert_eq!(source.usage_len(), 1);

        source.record_billing(vec![line("INV-1", 1, dec!(10.00), 5)]).unwrap();
        source.record_billing(vec![line("INV-1", 1, dec!(12.50), 5)]).unwrap();
        let lines = source.billing_lines(&march()).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].amount_paid, dec!(12.50));
    }
}
