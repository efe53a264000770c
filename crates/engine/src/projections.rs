//! Reporting projections.
//!
//! Pure functions over usage events, billing lines and committed summaries. None of
//! them keep state: every call recomputes its view from the inputs.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{NaiveDate, Timelike};
use rust_decimal::Decimal;
use serde::Serialize;

use clubmetrics_core::{AmenityId, MembershipEnrollmentId, round_currency};
use clubmetrics_events::{BillingLine, UsageEvent};
use clubmetrics_reference::{ReferenceError, ReferenceStore};

use crate::classifier::UsageStatus;
use crate::summary::MonthlySummary;

/// Usage of one amenity on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyUsage {
    pub amenity_id: AmenityId,
    pub date: NaiveDate,
    pub usage_count: u64,
    pub unique_member_count: u64,
}

pub fn daily_usage(events: &[UsageEvent]) -> Vec<DailyUsage> {
    let mut days: BTreeMap<(AmenityId, NaiveDate), (u64, BTreeSet<MembershipEnrollmentId>)> = BTreeMap::new();
    for e in events {
        let day = days.entry((e.amenity_id, e.usage_date())).or_default();
        day.0 += 1;
        day.1.insert(e.membership_enrollment_id);
    }

    days.into_iter()
        .map(|((amenity_id, date), (count, members))| DailyUsage {
            amenity_id,
            date,
            usage_count: count,
            unique_member_count: members.len() as u64,
        })
        .collect()
}

/// Hour-of-day histogram (UTC) for one amenity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeakUsageHours {
    pub amenity_id: AmenityId,
    pub hourly: [u64; 24],
    /// Busiest hour; the earliest wins a tie.
    pub peak_hour: Option<u32>,
}

pub fn peak_usage_hours(events: &[UsageEvent]) -> Vec<PeakUsageHours> {
    let mut histograms: BTreeMap<AmenityId, [u64; 24]> = BTreeMap::new();
    for e in events {
        let hour = e.usage_timestamp.hour() as usize;
        histograms.entry(e.amenity_id).or_insert([0; 24])[hour] += 1;
    }

    histograms
        .into_iter()
        .map(|(amenity_id, hourly)| {
            let mut peak: Option<(u32, u64)> = None;
            for (hour, &count) in hourly.iter().enumerate() {
                if count > 0 && peak.is_none_or(|(_, best)| count > best) {
                    peak = Some((hour as u32, count));
                }
            }
            PeakUsageHours {
                amenity_id,
                hourly,
                peak_hour: peak.map(|(h, _)| h),
            }
        })
        .collect()
}

/// Profitability view of one committed summary row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfitabilityRow {
    pub amenity_id: AmenityId,
    pub amenity_name: String,
    pub year: i32,
    pub month: u32,
    pub total_usage_count: u64,
    pub operating_cost: Decimal,
    pub member_spend: Decimal,
    pub revenue: Decimal,
    /// `member_spend + revenue - operating_cost`
    pub net_margin: Decimal,
    pub operating_cost_per_use: Option<Decimal>,
    pub usage_status: UsageStatus,
    pub watchlist: bool,
    /// Months of this margin needed to recover the initial build cost.
    pub payback_months: Option<Decimal>,
}

pub fn profitability<R>(summaries: &[MonthlySummary], reference: &R) -> Result<Vec<ProfitabilityRow>, ReferenceError>
where
    R: ReferenceStore + ?Sized,
{
    let mut rows = Vec::with_capacity(summaries.len());
    for s in summaries {
        let amenity_name = reference
            .amenity(s.amenity_id)?
            .map(|a| a.name)
            .unwrap_or_default();
        let build_cost = reference
            .cost_model(s.amenity_id)?
            .map(|m| m.initial_build_cost())
            .unwrap_or(Decimal::ZERO);

        let net_margin = s.total_member_spend + s.total_revenue - s.total_operating_cost;
        let payback_months = if net_margin > Decimal::ZERO && build_cost > Decimal::ZERO {
            Some(round_currency(build_cost / net_margin))
        } else {
            None
        };

        rows.push(ProfitabilityRow {
            amenity_id: s.amenity_id,
            amenity_name,
            year: s.year,
            month: s.month,
            total_usage_count: s.total_usage_count,
            operating_cost: s.total_operating_cost,
            member_spend: s.total_member_spend,
            revenue: s.total_revenue,
            net_margin,
            operating_cost_per_use: s.operating_cost_per_use,
            usage_status: s.usage_status,
            watchlist: s.watchlist,
            payback_months,
        });
    }
    Ok(rows)
}

/// Summaries currently on the watchlist, most expensive first.
pub fn watchlist(summaries: &[MonthlySummary]) -> Vec<&MonthlySummary> {
    let mut flagged: Vec<&MonthlySummary> = summaries.iter().filter(|s| s.watchlist).collect();
    flagged.sort_by(|a, b| {
        b.total_operating_cost
            .cmp(&a.total_operating_cost)
            .then_with(|| a.key().cmp(&b.key()))
    });
    flagged
}

/// Billed/paid totals per charge type (voided lines excluded).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChargeTypeRevenue {
    pub charge_type: String,
    pub line_count: u64,
    pub amount_billed: Decimal,
    pub amount_paid: Decimal,
    pub outstanding: Decimal,
}

pub fn revenue_by_charge_type(lines: &[BillingLine]) -> Vec<ChargeTypeRevenue> {
    let mut totals: BTreeMap<&str, (u64, Decimal, Decimal)> = BTreeMap::new();
    for line in lines.iter().filter(|l| l.counts_toward_revenue()) {
        let t = totals
            .entry(line.charge_type.as_str())
            .or_insert((0, Decimal::ZERO, Decimal::ZERO));
        t.0 += 1;
        t.1 += line.amount_billed;
        t.2 += line.amount_paid;
    }

    totals
        .into_iter()
        .map(|(charge_type, (line_count, billed, paid))| ChargeTypeRevenue {
            charge_type: charge_type.to_string(),
            line_count,
            amount_billed: billed,
            amount_paid: paid,
            outstanding: billed - paid,
        })
        .collect()
}
