//! `clubmetrics-engine`: monthly amenity rollups, cost estimation and classification.
//!
//! Pipeline for one recomputation run:
//!
//! 1. read usage events / billing lines for the requested months ([`EventSource`])
//! 2. [`aggregator::aggregate`] them per `(amenity, month)` and `(member, month)`
//! 3. [`estimator::estimate`] operating cost and member spend (actual-if-present)
//! 4. [`classifier::classify`] usage status and watchlist
//! 5. gate every row through the [`grain::GrainValidator`]
//! 6. upsert into the summary / engagement stores, serialized per period key
//!
//! Every run recomputes full period values from raw events. Nothing is incremented
//! in place, so replays and late events converge on the same rows.
//!
//! [`EventSource`]: clubmetrics_events::EventSource

pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod engagement;
pub mod error;
pub mod estimator;
pub mod grain;
pub mod locks;
pub mod projections;
pub mod recompute;
pub mod retry;
pub mod store;
pub mod summary;

pub use aggregator::{AggregationOutput, DataQualityIssue, DataQualityWarning, MemberPeriodAggregate, PeriodAggregate};
pub use classifier::{ClassifierThresholds, Labels, UsageStatus};
pub use config::{ConfigError, EngineConfig};
pub use error::{EngineError, GrainViolation, RejectReason};
pub use estimator::{CostEstimate, Metric};
pub use grain::{GrainRow, GrainValidator};
pub use locks::PeriodLocks;
pub use recompute::{CancellationToken, RecomputeEngine, RecomputeRequest, RunCounts, RunReport};
pub use retry::{BackoffStrategy, RetryPolicy};
pub use store::{InMemoryReadModelStore, ReadModelStore, StoreError, UpsertOutcome};
pub use summary::{EngagementKey, MonthlySummary, SummaryKey, UsageEngagement, ValueSource};
