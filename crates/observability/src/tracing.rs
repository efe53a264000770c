//! Tracing subscriber installation.
//!
//! Batch runs log JSON lines by default so that run reports and per-row rejections
//! can be collected by whatever ships the job's stdout. `pretty` is for local use.

use std::str::FromStr;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

pub const ENV_LOG_FORMAT: &str = "CLUBMETRICS_LOG_FORMAT";

/// Filter used when `RUST_LOG` is unset or unparsable.
pub const DEFAULT_FILTER: &str = "info";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown log format {0:?} (expected \"json\" or \"pretty\")")]
pub struct LogFormatError(String);

impl FromStr for LogFormat {
    type Err = LogFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "text" => Ok(LogFormat::Pretty),
            _ => Err(LogFormatError(s.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TracingOptions {
    pub format: LogFormat,
    /// Used only when `RUST_LOG` is not set.
    pub default_filter: String,
}

impl Default for TracingOptions {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            default_filter: DEFAULT_FILTER.to_string(),
        }
    }
}

impl TracingOptions {
    /// Options from `CLUBMETRICS_LOG_FORMAT`; an unknown value falls back to JSON.
    pub fn from_env() -> Self {
        let format = std::env::var(ENV_LOG_FORMAT)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or_default();
        Self {
            format,
            ..Self::default()
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }
}

/// Install the global subscriber. Returns `false` when one was already installed.
pub fn init(options: TracingOptions) -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&options.default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = match options.format {
        LogFormat::Json => builder
            .json()
            .with_timer(tracing_subscriber::fmt::time::SystemTime)
            .with_target(false)
            .try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
    installed.is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_formats_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!(" pretty ".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert_eq!("text".parse::<LogFormat>(), Ok(LogFormat::Pretty));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn second_init_is_a_no_op() {
        init(TracingOptions::default());
        assert!(!init(TracingOptions::default().with_format(LogFormat::Pretty)));
    }
}
