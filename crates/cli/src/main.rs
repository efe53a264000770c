//! `clubmetrics <dataset.json>`: recompute the requested months from a dataset file
//! and print the run report plus reporting projections as JSON.

mod dataset;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use serde::Serialize;

use clubmetrics_engine::projections::{
    self, ChargeTypeRevenue, DailyUsage, PeakUsageHours, ProfitabilityRow,
};
use clubmetrics_engine::{
    CancellationToken, EngagementKey, EngineConfig, InMemoryReadModelStore, MonthlySummary, ReadModelStore,
    RecomputeEngine, RunReport, SummaryKey, UsageEngagement,
};
use clubmetrics_events::{EventFilter, EventSource};

use crate::dataset::Dataset;

const ENV_DATASET: &str = "CLUBMETRICS_DATASET";

#[derive(Serialize)]
struct Output {
    report: RunReport,
    summaries: Vec<MonthlySummary>,
    profitability: Vec<ProfitabilityRow>,
    watchlist: Vec<SummaryKey>,
    daily_usage: Vec<DailyUsage>,
    peak_usage_hours: Vec<PeakUsageHours>,
    revenue_by_charge_type: Vec<ChargeTypeRevenue>,
}

fn dataset_path() -> anyhow::Result<PathBuf> {
    std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os(ENV_DATASET).map(PathBuf::from))
        .with_context(|| format!("usage: clubmetrics <dataset.json> (or set {ENV_DATASET})"))
}

fn main() -> anyhow::Result<()> {
    clubmetrics_observability::init();

    let path = dataset_path()?;
    let loaded = Dataset::load(&path)?.into_stores()?;
    let config = match loaded.config {
        Some(config) => config,
        None => EngineConfig::from_env().context("reading CLUBMETRICS_* configuration")?,
    };
    tracing::info!(dataset = %path.display(), workers = config.workers, "dataset loaded");

    let summaries: Arc<InMemoryReadModelStore<SummaryKey, MonthlySummary>> = Arc::new(InMemoryReadModelStore::new());
    let engagement: Arc<InMemoryReadModelStore<EngagementKey, UsageEngagement>> =
        Arc::new(InMemoryReadModelStore::new());
    let engine = RecomputeEngine::new(
        loaded.events.clone(),
        loaded.reference.clone(),
        summaries.clone(),
        engagement,
        config,
    );

    let report = engine
        .run(&loaded.request, &CancellationToken::new())
        .context("recompute failed")?;

    let mut filter = EventFilter::months(loaded.request.first, loaded.request.last);
    if let Some(amenity_id) = loaded.request.amenity_id {
        filter = filter.with_amenity(amenity_id);
    }
    let usage = loaded.events.usage_events(&filter)?;
    let billing = loaded.events.billing_lines(&filter)?;

    let rows = summaries.list()?;
    let output = Output {
        profitability: projections::profitability(&rows, loaded.reference.as_ref())?,
        watchlist: projections::watchlist(&rows).into_iter().map(MonthlySummary::key).collect(),
        daily_usage: projections::daily_usage(&usage),
        peak_usage_hours: projections::peak_usage_hours(&usage),
        revenue_by_charge_type: projections::revenue_by_charge_type(&billing),
        summaries: rows,
        report,
    };

    serde_json::to_writer_pretty(std::io::stdout().lock(), &output)?;
    println!();
    Ok(())
}
