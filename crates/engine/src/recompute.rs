//! Recomputation runner: reads raw events for a range of months, derives every
//! summary and engagement row from scratch, and upserts them.
//!
//! A run has two phases:
//!
//! - **prepare**: write versions are drawn, then all source, reference and stored-row
//!   reads, estimation, classification and grain validation happen. Any read failure
//!   here aborts the run before a single write.
//! - **commit**: validated rows are upserted by a scoped worker pool, and in-scope
//!   rows with nothing left to derive them are removed. Writes to the same period
//!   key are serialized through [`PeriodLocks`]; cancellation is checked between keys.
//!
//! A store refuses a write whose version is older than the stored one, so when two
//! runs overlap the one that read the source last wins.

use std::collections::BTreeSet;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::thread;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use clubmetrics_core::{AmenityId, EventId, PeriodKey, YearMonth};
use clubmetrics_events::{EventFilter, EventSource, SourceError};
use clubmetrics_reference::{AmenityCostModel, ReferenceError, ReferenceStore};

use crate::aggregator::{self, DataQualityIssue, DataQualityWarning, PeriodAggregate};
use crate::classifier::classify;
use crate::config::EngineConfig;
use crate::engagement::build_engagement;
use crate::error::{EngineError, EntityKind, RejectReason};
use crate::estimator::{attributed_revenue, estimate};
use crate::grain::{GrainRow, GrainValidator};
use crate::locks::PeriodLocks;
use crate::store::{ReadModelStore, StoreError, UpsertOutcome};
use crate::summary::{EngagementKey, MonthlySummary, SummaryKey, UsageEngagement};

/// Months (inclusive) to recompute, optionally for a single amenity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecomputeRequest {
    pub first: YearMonth,
    pub last: YearMonth,
    #[serde(default)]
    pub amenity_id: Option<AmenityId>,
}

impl RecomputeRequest {
    pub fn month(period: YearMonth) -> Self {
        Self::months(period, period)
    }

    pub fn months(first: YearMonth, last: YearMonth) -> Self {
        Self {
            first,
            last,
            amenity_id: None,
        }
    }

    pub fn for_amenity(mut self, amenity_id: AmenityId) -> Self {
        self.amenity_id = Some(amenity_id);
        self
    }

    pub fn periods(&self) -> Vec<YearMonth> {
        self.first.through(self.last)
    }

    /// Whether `key` falls in the requested months.
    fn covers<E>(&self, key: &PeriodKey<E>) -> bool {
        key.year_month()
            .is_ok_and(|period| self.first <= period && period <= self.last)
    }

    fn covers_summary(&self, key: &SummaryKey) -> bool {
        self.covers(key) && self.amenity_id.is_none_or(|id| id == key.entity_id)
    }

    fn filter(&self) -> EventFilter {
        let filter = EventFilter::months(self.first, self.last);
        match self.amenity_id {
            Some(id) => filter.with_amenity(id),
            None => filter,
        }
    }
}

/// Cooperative cancellation flag shared between a caller and a running engine.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Period key of either read model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "grain", content = "key", rename_all = "snake_case")]
pub enum PeriodRef {
    Amenity(SummaryKey),
    Member(EngagementKey),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommittedPeriod {
    pub period: PeriodRef,
    pub outcome: UpsertOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// The run was cancelled before this key was started.
    Cancelled,
    /// The worker holding this key died before reporting.
    WorkerFailed,
    /// A run that read the source later already wrote this key.
    Superseded,
    StoreUnavailable { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedPeriod {
    pub period: PeriodRef,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// What a rejection refers to: a raw event or a derived period row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum RowSubject {
    Event(EventId),
    Period(PeriodRef),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedRow {
    pub subject: RowSubject,
    pub reason: RejectReason,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunCounts {
    pub committed: usize,
    pub inserted: usize,
    pub replaced: usize,
    pub unchanged: usize,
    pub removed: usize,
    pub skipped: usize,
    pub rejected: usize,
    pub warnings: usize,
}

/// Outcome of one recomputation run. Every list is ordered by key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub request: RecomputeRequest,
    pub committed: Vec<CommittedPeriod>,
    pub skipped: Vec<SkippedPeriod>,
    pub rejected: Vec<RejectedRow>,
    pub warnings: Vec<DataQualityWarning>,
}

impl RunReport {
    pub fn counts(&self) -> RunCounts {
        let outcome = |o: UpsertOutcome| self.committed.iter().filter(|c| c.outcome == o).count();
        RunCounts {
            committed: self.committed.len(),
            inserted: outcome(UpsertOutcome::Inserted),
            replaced: outcome(UpsertOutcome::Replaced),
            unchanged: outcome(UpsertOutcome::Unchanged),
            removed: outcome(UpsertOutcome::Removed),
            skipped: self.skipped.len(),
            rejected: self.rejected.len(),
            warnings: self.warnings.len(),
        }
    }

    pub fn outcome_of(&self, period: PeriodRef) -> Option<UpsertOutcome> {
        self.committed
            .iter()
            .find(|c| c.period == period)
            .map(|c| c.outcome)
    }
}

/// A validated row, or a stale key to remove, waiting for the commit phase.
enum PendingWrite {
    Summary(MonthlySummary),
    Engagement(UsageEngagement),
    Remove(PeriodRef),
}

impl PendingWrite {
    fn period(&self) -> PeriodRef {
        match self {
            PendingWrite::Summary(row) => PeriodRef::Amenity(row.key()),
            PendingWrite::Engagement(row) => PeriodRef::Member(row.key()),
            PendingWrite::Remove(period) => *period,
        }
    }
}

/// Versions drawn from each store before the source read.
#[derive(Debug, Clone, Copy)]
struct WriteVersions {
    summary: u64,
    engagement: u64,
}

enum WriteOutcome {
    Committed(UpsertOutcome),
    Skipped(SkipReason),
    Rejected(RejectReason),
}

/// Everything the prepare phase produced.
struct Prepared {
    versions: WriteVersions,
    writes: Vec<PendingWrite>,
    rejected: Vec<RejectedRow>,
    warnings: Vec<DataQualityWarning>,
}

fn shared_summary_locks() -> Arc<PeriodLocks<SummaryKey>> {
    static LOCKS: OnceLock<Arc<PeriodLocks<SummaryKey>>> = OnceLock::new();
    LOCKS.get_or_init(|| Arc::new(PeriodLocks::new())).clone()
}

fn shared_engagement_locks() -> Arc<PeriodLocks<EngagementKey>> {
    static LOCKS: OnceLock<Arc<PeriodLocks<EngagementKey>>> = OnceLock::new();
    LOCKS.get_or_init(|| Arc::new(PeriodLocks::new())).clone()
}

/// Batch recomputation engine over an event source, a reference store and the two
/// read-model stores.
pub struct RecomputeEngine<E, R, S, G> {
    events: E,
    reference: R,
    summaries: S,
    engagement: G,
    config: EngineConfig,
    summary_locks: Arc<PeriodLocks<SummaryKey>>,
    engagement_locks: Arc<PeriodLocks<EngagementKey>>,
}

impl<E, R, S, G> RecomputeEngine<E, R, S, G>
where
    E: EventSource,
    R: ReferenceStore,
    S: ReadModelStore<SummaryKey, MonthlySummary>,
    G: ReadModelStore<EngagementKey, UsageEngagement>,
{
    /// Engines built here share the process-wide key locks.
    pub fn new(events: E, reference: R, summaries: S, engagement: G, config: EngineConfig) -> Self {
        Self {
            events,
            reference,
            summaries,
            engagement,
            config,
            summary_locks: shared_summary_locks(),
            engagement_locks: shared_engagement_locks(),
        }
    }

    /// Use these lock tables instead of the process-wide ones, e.g. to scope
    /// serialization to a group of engines over the same stores.
    pub fn with_locks(
        mut self,
        summary_locks: Arc<PeriodLocks<SummaryKey>>,
        engagement_locks: Arc<PeriodLocks<EngagementKey>>,
    ) -> Self {
        self.summary_locks = summary_locks;
        self.engagement_locks = engagement_locks;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn summaries(&self) -> &S {
        &self.summaries
    }

    pub fn engagement(&self) -> &G {
        &self.engagement
    }

    /// Recompute every period in `request`.
    ///
    /// Returns `Err` only for batch-level failures, in which case nothing was
    /// written. Row-level problems are listed in the report.
    pub fn run(&self, request: &RecomputeRequest, cancel: &CancellationToken) -> Result<RunReport, EngineError> {
        if request.first > request.last {
            return Err(EngineError::InvalidRequest(format!(
                "first month {} is after last month {}",
                request.first, request.last
            )));
        }

        let run_id = Uuid::now_v7();
        let started_at = Utc::now();
        info!(
            %run_id,
            first = %request.first,
            last = %request.last,
            amenity_id = ?request.amenity_id,
            "recompute started"
        );

        let prepared = match self.prepare(request) {
            Ok(p) => p,
            Err(err) => {
                error!(%run_id, error = %err, "recompute aborted before commit");
                return Err(err);
            }
        };

        let mut rejected = prepared.rejected;
        let mut committed = Vec::new();
        let mut skipped = Vec::new();

        for (period, outcome) in self.commit(prepared.writes, prepared.versions, cancel) {
            match outcome {
                WriteOutcome::Committed(outcome) => committed.push(CommittedPeriod { period, outcome }),
                WriteOutcome::Skipped(reason) => skipped.push(SkippedPeriod { period, reason }),
                WriteOutcome::Rejected(reason) => {
                    warn!(%run_id, ?period, %reason, "row rejected at commit");
                    rejected.push(RejectedRow {
                        subject: RowSubject::Period(period),
                        reason,
                    });
                }
            }
        }

        committed.sort_by_key(|c| c.period);
        skipped.sort_by_key(|s| s.period);
        rejected.sort_by_key(|r| r.subject);

        let report = RunReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            request: *request,
            committed,
            skipped,
            rejected,
            warnings: prepared.warnings,
        };

        let counts = report.counts();
        info!(
            %run_id,
            committed = counts.committed,
            inserted = counts.inserted,
            replaced = counts.replaced,
            unchanged = counts.unchanged,
            removed = counts.removed,
            skipped = counts.skipped,
            rejected = counts.rejected,
            warnings = counts.warnings,
            "recompute finished"
        );
        Ok(report)
    }

    fn read_reference<T>(
        &self,
        operation: &str,
        op: impl FnMut() -> Result<T, ReferenceError>,
    ) -> Result<T, ReferenceError> {
        self.config
            .read_retry
            .run(operation, |e: &ReferenceError| matches!(e, ReferenceError::Unavailable(_)), op)
    }

    fn read_store<T>(&self, operation: &str, op: impl FnMut() -> Result<T, StoreError>) -> Result<T, StoreError> {
        self.config
            .read_retry
            .run(operation, |e: &StoreError| matches!(e, StoreError::Unavailable(_)), op)
    }

    fn prepare(&self, request: &RecomputeRequest) -> Result<Prepared, EngineError> {
        let filter = request.filter();
        let retry = &self.config.read_retry;

        // Drawn before the source read: whoever reads later writes a higher version.
        let versions = WriteVersions {
            summary: self.read_store("summary_version", || self.summaries.next_version())?,
            engagement: self.read_store("engagement_version", || self.engagement.next_version())?,
        };

        let usage = retry.run("usage_events", SourceError::is_transient, || self.events.usage_events(&filter))?;
        let billing = retry.run("billing_lines", SourceError::is_transient, || self.events.billing_lines(&filter))?;
        debug!(usage = usage.len(), billing = billing.len(), "source read complete");

        let output = self.read_reference("aggregate", || aggregator::aggregate(&usage, &self.reference))?;

        let mut rejected: Vec<RejectedRow> = output
            .warnings
            .iter()
            .filter_map(|w| {
                let reason = match w.issue {
                    DataQualityIssue::UnknownAmenity { amenity_id } => RejectReason::ReferenceNotFound {
                        entity: EntityKind::Amenity,
                        id: amenity_id.to_string(),
                    },
                    DataQualityIssue::UnknownEnrollment { membership_enrollment_id } => {
                        RejectReason::ReferenceNotFound {
                            entity: EntityKind::MembershipEnrollment,
                            id: membership_enrollment_id.to_string(),
                        }
                    }
                    _ => return None,
                };
                Some(RejectedRow {
                    subject: RowSubject::Event(w.event_id),
                    reason,
                })
            })
            .collect();

        let revenue = attributed_revenue(&billing);
        let mut aggregates = output.aggregates;
        if self.config.include_idle_amenities {
            aggregates.extend(self.idle_aggregates(request, &aggregates)?);
        }
        // Revenue with no usage behind it still lands on a row.
        let seen: BTreeSet<SummaryKey> = aggregates.iter().map(|a| a.key).collect();
        aggregates.extend(
            revenue
                .keys()
                .filter(|key| !seen.contains(*key))
                .map(|key| PeriodAggregate::idle(*key)),
        );
        aggregates.sort_by_key(|a| a.key);

        let mut candidates = Vec::with_capacity(aggregates.len());
        for agg in &aggregates {
            let key = agg.key;
            let Some(_amenity) = self.read_reference("amenity", || self.reference.amenity(key.entity_id))? else {
                warn!(%key, "period names an amenity missing from the reference store");
                rejected.push(RejectedRow {
                    subject: RowSubject::Period(PeriodRef::Amenity(key)),
                    reason: RejectReason::ReferenceNotFound {
                        entity: EntityKind::Amenity,
                        id: key.entity_id.to_string(),
                    },
                });
                continue;
            };

            let model = match self.read_reference("cost_model", || self.reference.cost_model(key.entity_id))? {
                Some(model) => model,
                None => {
                    warn!(amenity_id = %key.entity_id, "no cost model; treating amenity as zero-cost and included in dues");
                    AmenityCostModel::absent()
                }
            };
            let actual = self.read_reference("stored_actual", || self.reference.stored_actual(&key))?;

            let estimate = estimate(agg, &model, actual.as_ref());
            let labels = classify(agg, &estimate, &self.config.thresholds);
            let total_revenue = revenue.get(&key).copied().unwrap_or(Decimal::ZERO);
            candidates.push(MonthlySummary::build(agg, &estimate, &labels, total_revenue));
        }

        let summaries = GrainValidator::validate(candidates);
        for (key, violation) in summaries.rejected {
            warn!(%key, %violation, "summary row failed grain validation");
            rejected.push(RejectedRow {
                subject: RowSubject::Period(PeriodRef::Amenity(key)),
                reason: violation.into(),
            });
        }
        let mut writes: Vec<PendingWrite> = summaries.accepted.into_iter().map(PendingWrite::Summary).collect();

        let derived: BTreeSet<SummaryKey> = aggregates.iter().map(|a| a.key).collect();
        let stale: Vec<SummaryKey> = self
            .read_store("summaries", || self.summaries.list())?
            .iter()
            .map(MonthlySummary::key)
            .filter(|key| request.covers_summary(key) && !derived.contains(key))
            .collect();
        if !stale.is_empty() {
            debug!(count = stale.len(), "stale summary rows to remove");
        }
        writes.extend(stale.into_iter().map(|key| PendingWrite::Remove(PeriodRef::Amenity(key))));

        // Engagement rows span every amenity a member used, so a single-amenity run
        // only sees part of them.
        if request.amenity_id.is_none() {
            let (rows, missing) =
                self.read_reference("engagement", || build_engagement(&output.member_aggregates, &self.reference))?;
            for (key, reason) in missing {
                rejected.push(RejectedRow {
                    subject: RowSubject::Period(PeriodRef::Member(key)),
                    reason,
                });
            }

            let engagement = GrainValidator::validate(rows);
            for (key, violation) in engagement.rejected {
                warn!(%key, %violation, "engagement row failed grain validation");
                rejected.push(RejectedRow {
                    subject: RowSubject::Period(PeriodRef::Member(key)),
                    reason: violation.into(),
                });
            }
            writes.extend(engagement.accepted.into_iter().map(PendingWrite::Engagement));

            let active: BTreeSet<EngagementKey> = output.member_aggregates.iter().map(|m| m.key).collect();
            let stale: Vec<EngagementKey> = self
                .read_store("engagement", || self.engagement.list())?
                .iter()
                .map(UsageEngagement::key)
                .filter(|key| request.covers(key) && !active.contains(key))
                .collect();
            writes.extend(stale.into_iter().map(|key| PendingWrite::Remove(PeriodRef::Member(key))));
        }

        Ok(Prepared {
            versions,
            writes,
            rejected,
            warnings: output.warnings,
        })
    }

    /// Zero-usage aggregates for active amenities that had no events in a month.
    fn idle_aggregates(
        &self,
        request: &RecomputeRequest,
        existing: &[PeriodAggregate],
    ) -> Result<Vec<PeriodAggregate>, ReferenceError> {
        let seen: BTreeSet<SummaryKey> = existing.iter().map(|a| a.key).collect();
        let periods = request.periods();

        let mut idle = Vec::new();
        for amenity in self.read_reference("amenities", || self.reference.amenities())? {
            if !amenity.is_active || request.amenity_id.is_some_and(|id| id != amenity.amenity_id) {
                continue;
            }
            for period in &periods {
                let key = PeriodKey::new(amenity.amenity_id, *period);
                if !seen.contains(&key) {
                    idle.push(PeriodAggregate::idle(key));
                }
            }
        }
        Ok(idle)
    }

    fn commit(
        &self,
        writes: Vec<PendingWrite>,
        versions: WriteVersions,
        cancel: &CancellationToken,
    ) -> Vec<(PeriodRef, WriteOutcome)> {
        let workers = self.config.workers.clamp(1, writes.len().max(1));
        let next = AtomicUsize::new(0);
        let outcomes_cell: Mutex<Vec<Option<WriteOutcome>>> = Mutex::new(writes.iter().map(|_| None).collect());

        let (next, outcomes, queue) = (&next, &outcomes_cell, &writes);
        thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(move || {
                        loop {
                            let idx = next.fetch_add(1, Ordering::SeqCst);
                            let Some(write) = queue.get(idx) else {
                                break;
                            };
                            let outcome = if cancel.is_cancelled() {
                                WriteOutcome::Skipped(SkipReason::Cancelled)
                            } else {
                                self.write(write, versions)
                            };
                            let mut slots = outcomes.lock().unwrap_or_else(|p| p.into_inner());
                            slots[idx] = Some(outcome);
                        }
                    })
                })
                .collect();

            for handle in handles {
                if handle.join().is_err() {
                    error!("commit worker panicked");
                }
            }
        });

        let slots = outcomes_cell.into_inner().unwrap_or_else(|p| p.into_inner());
        writes
            .iter()
            .zip(slots)
            .map(|(write, slot)| {
                (write.period(), slot.unwrap_or(WriteOutcome::Skipped(SkipReason::WorkerFailed)))
            })
            .collect()
    }

    fn write(&self, write: &PendingWrite, versions: WriteVersions) -> WriteOutcome {
        match write {
            PendingWrite::Summary(row) => upsert_validated(
                &self.summaries,
                &self.summary_locks,
                row,
                versions.summary,
                EntityKind::Amenity,
                |id| self.read_reference("amenity", || self.reference.amenity(id)).map(|a| a.is_some()),
            ),
            PendingWrite::Engagement(row) => upsert_validated(
                &self.engagement,
                &self.engagement_locks,
                row,
                versions.engagement,
                EntityKind::MembershipEnrollment,
                |id| self.read_reference("enrollment", || self.reference.enrollment(id)).map(|e| e.is_some()),
            ),
            PendingWrite::Remove(PeriodRef::Amenity(key)) => remove_stale::<SummaryKey, MonthlySummary, S>(
                &self.summaries,
                &self.summary_locks,
                key,
                versions.summary,
            ),
            PendingWrite::Remove(PeriodRef::Member(key)) => remove_stale::<EngagementKey, UsageEngagement, G>(
                &self.engagement,
                &self.engagement_locks,
                key,
                versions.engagement,
            ),
        }
    }
}

/// Upsert under the key's lock. An integrity violation is retried once, after the
/// row is re-validated and its entity is confirmed to still exist.
fn upsert_validated<V, St>(
    store: &St,
    locks: &PeriodLocks<PeriodKey<V::Entity>>,
    row: &V,
    version: u64,
    entity: EntityKind,
    entity_exists: impl Fn(V::Entity) -> Result<bool, ReferenceError>,
) -> WriteOutcome
where
    V: GrainRow + Clone,
    V::Entity: Hash,
    St: ReadModelStore<PeriodKey<V::Entity>, V> + ?Sized,
{
    let key = row.period_key();
    locks.with_lock(&key, || {
        let message = match store.upsert(key, row.clone(), version) {
            Ok(UpsertOutcome::Superseded) => {
                debug!(%key, version, "newer row already stored");
                return WriteOutcome::Skipped(SkipReason::Superseded);
            }
            Ok(outcome) => {
                debug!(%key, ?outcome, "row committed");
                return WriteOutcome::Committed(outcome);
            }
            Err(StoreError::Unavailable(message)) => {
                return WriteOutcome::Skipped(SkipReason::StoreUnavailable { message });
            }
            Err(StoreError::IntegrityViolation(message)) => message,
        };

        warn!(%key, error = %message, "integrity violation on upsert; re-validating");
        if let Err(violation) = GrainValidator::validate_row(row) {
            return WriteOutcome::Rejected(violation.into());
        }
        match entity_exists(key.entity_id) {
            Ok(true) => {}
            Ok(false) => {
                return WriteOutcome::Rejected(RejectReason::ReferenceNotFound {
                    entity,
                    id: key.entity_id.to_string(),
                });
            }
            Err(err) => {
                return WriteOutcome::Skipped(SkipReason::StoreUnavailable {
                    message: err.to_string(),
                });
            }
        }

        match store.upsert(key, row.clone(), version) {
            Ok(UpsertOutcome::Superseded) => WriteOutcome::Skipped(SkipReason::Superseded),
            Ok(outcome) => WriteOutcome::Committed(outcome),
            Err(StoreError::IntegrityViolation(message)) => {
                WriteOutcome::Rejected(RejectReason::IntegrityViolation(message))
            }
            Err(StoreError::Unavailable(message)) => WriteOutcome::Skipped(SkipReason::StoreUnavailable { message }),
        }
    })
}

/// Remove a row nothing in the current run derives any more.
fn remove_stale<K, V, St>(store: &St, locks: &PeriodLocks<K>, key: &K, version: u64) -> WriteOutcome
where
    K: Eq + Hash + Clone + core::fmt::Display,
    St: ReadModelStore<K, V> + ?Sized,
{
    locks.with_lock(key, || match store.remove(key, version) {
        Ok(UpsertOutcome::Superseded) => WriteOutcome::Skipped(SkipReason::Superseded),
        Ok(outcome) => {
            debug!(%key, ?outcome, "stale row removed");
            WriteOutcome::Committed(outcome)
        }
        Err(StoreError::Unavailable(message)) => WriteOutcome::Skipped(SkipReason::StoreUnavailable { message }),
        Err(StoreError::IntegrityViolation(message)) => {
            WriteOutcome::Rejected(RejectReason::IntegrityViolation(message))
        }
    })
}
