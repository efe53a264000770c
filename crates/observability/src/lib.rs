//! Process-wide tracing setup shared by the clubmetrics binaries.

pub mod tracing;

pub use crate::tracing::{LogFormat, LogFormatError, TracingOptions};

/// Initialize tracing from the environment (`RUST_LOG`, `CLUBMETRICS_LOG_FORMAT`).
///
/// Safe to call multiple times; only the first call installs a subscriber.
pub fn init() -> bool {
    crate::tracing::init(TracingOptions::from_env())
}
