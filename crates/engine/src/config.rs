//! Engine configuration.
//!
//! Defaults are usable as-is; `from_env` overrides individual fields from
//! `CLUBMETRICS_*` environment variables, and the whole struct deserializes from
//! JSON for batch jobs that ship their config alongside the data.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classifier::ClassifierThresholds;
use crate::retry::RetryPolicy;

pub const ENV_USAGE_CEILING: &str = "CLUBMETRICS_UNDERUSE_USAGE_CEILING";
pub const ENV_COST_FLOOR: &str = "CLUBMETRICS_UNDERUSE_COST_FLOOR";
pub const ENV_WORKERS: &str = "CLUBMETRICS_WORKERS";
pub const ENV_INCLUDE_IDLE: &str = "CLUBMETRICS_INCLUDE_IDLE_AMENITIES";
pub const ENV_READ_RETRIES: &str = "CLUBMETRICS_READ_RETRIES";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub thresholds: ClassifierThresholds,
    /// Worker threads used to commit period keys in parallel.
    pub workers: usize,
    /// Emit zero-usage rows for active amenities with no events in a month.
    pub include_idle_amenities: bool,
    pub read_retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            thresholds: ClassifierThresholds::default(),
            workers: 4,
            include_idle_amenities: true,
            read_retry: RetryPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn with_thresholds(mut self, thresholds: ClassifierThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_read_retry(mut self, policy: RetryPolicy) -> Self {
        self.read_retry = policy;
        self
    }

    pub fn with_idle_amenities(mut self, include: bool) -> Self {
        self.include_idle_amenities = include;
        self
    }

    /// Defaults overridden by process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each known key.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = lookup(ENV_USAGE_CEILING) {
            config.thresholds.underuse_usage_ceiling = parse(ENV_USAGE_CEILING, &v)?;
        }
        if let Some(v) = lookup(ENV_COST_FLOOR) {
            let floor: Decimal = parse(ENV_COST_FLOOR, &v)?;
            if floor < Decimal::ZERO {
                return Err(invalid(ENV_COST_FLOOR, &v, "must be >= 0"));
            }
            config.thresholds.underuse_cost_floor = floor;
        }
        if let Some(v) = lookup(ENV_WORKERS) {
            let workers: usize = parse(ENV_WORKERS, &v)?;
            if workers == 0 {
                return Err(invalid(ENV_WORKERS, &v, "must be at least 1"));
            }
            config.workers = workers;
        }
        if let Some(v) = lookup(ENV_INCLUDE_IDLE) {
            config.include_idle_amenities = parse(ENV_INCLUDE_IDLE, &v)?;
        }
        if let Some(v) = lookup(ENV_READ_RETRIES) {
            config.read_retry.max_retries = parse(ENV_READ_RETRIES, &v)?;
        }

        Ok(config)
    }
}

fn invalid(key: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| invalid(key, value, e.to_string()))
}
