//! Batch input: reference snapshot, raw events and the recompute request in one
//! JSON document.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use clubmetrics_engine::{EngineConfig, RecomputeRequest};
use clubmetrics_events::{BillingLine, InMemoryEventSource, UsageEvent};
use clubmetrics_reference::{InMemoryReferenceStore, ReferenceSnapshot};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    pub reference: ReferenceSnapshot,
    #[serde(default)]
    pub usage_events: Vec<UsageEvent>,
    #[serde(default)]
    pub billing_lines: Vec<BillingLine>,
    pub request: RecomputeRequest,
    /// Overrides the environment-derived engine config when present.
    #[serde(default)]
    pub config: Option<EngineConfig>,
}

impl Dataset {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("reading dataset {}", path.display()))?;
        Self::parse(&raw).with_context(|| format!("parsing dataset {}", path.display()))
    }

    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }

    /// Split into the in-memory source/reference stores the engine reads from.
    pub fn into_stores(self) -> anyhow::Result<Loaded> {
        let events = InMemoryEventSource::new();
        events.record_usage(self.usage_events).context("loading usage events")?;
        events.record_billing(self.billing_lines).context("loading billing lines")?;

        Ok(Loaded {
            events: Arc::new(events),
            reference: Arc::new(InMemoryReferenceStore::from_snapshot(self.reference)),
            request: self.request,
            config: self.config,
        })
    }
}

pub struct Loaded {
    pub events: Arc<InMemoryEventSource>,
    pub reference: Arc<InMemoryReferenceStore>,
    pub request: RecomputeRequest,
    pub config: Option<EngineConfig>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clubmetrics_reference::ReferenceStore;
    use rust_decimal_macros::dec;

    const SAMPLE: &str = r#"{
        "reference": {
            "amenities": [
                {"amenity_id": "0190c3a0-0000-7000-8000-000000000001", "name": "Pool", "category": "aquatics", "is_active": true}
            ],
            "cost_models": [
                ["0190c3a0-0000-7000-8000-000000000001", {
                    "initial_build_cost": "0", "monthly_fixed_cost": "200", "cost_per_use": "3",
                    "in_dues_flag": false, "member_cost_per_use": "4"
                }]
            ],
            "calendar": {"first": "2026-01-01", "last": "2026-12-31"}
        },
        "usage_events": [],
        "request": {"first": {"year": 2026, "month": 3}, "last": {"year": 2026, "month": 3}}
    }"#;

    #[test]
    fn parses_minimal_dataset() {
        let dataset = Dataset::parse(SAMPLE).unwrap();
        assert!(dataset.config.is_none());
        assert!(dataset.billing_lines.is_empty());

        let loaded = dataset.into_stores().unwrap();
        let pool = "0190c3a0-0000-7000-8000-000000000001".parse().unwrap();
        let model = loaded.reference.cost_model(pool).unwrap().unwrap();
        assert_eq!(model.cost_per_use(), dec!(3));
    }

    #[test]
    fn rejects_invalid_cost_model() {
        let broken = SAMPLE.replace(r#""in_dues_flag": false"#, r#""in_dues_flag": true"#);
        assert!(Dataset::parse(&broken).is_err());
    }

    #[test]
    fn rejects_month_out_of_range() {
        let broken = SAMPLE.replace(r#""month": 3}, "last""#, r#""month": 13}, "last""#);
        assert!(Dataset::parse(&broken).is_err());
    }
}
