//! Structured logging setup and storage events
//!
//! Every TenRing crate logs through `tracing`; nothing is printed unless the
//! application installs a subscriber. The solver emits:
//!
//! - `info` per sweep when `TrAlsConfig::verbose` is set, `debug` otherwise
//! - `warn` for uniform-fallback distributions, underdetermined sketches and
//!   a skipped error check
//! - `debug` for every slab read from a tensor file ([`record_slab_read`])
//!
//! ```ignore
//! use tenring_ooc::tracing_support::{init_tracing, TracingConfig};
//!
//! init_tracing(TracingConfig::from_env())?;
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: filter directive (default `tenring_decomp=info,tenring_ooc=info`)
//! - `TENRING_LOG_FORMAT`: `pretty`, `compact` or `json` (default `pretty`)

use anyhow::Result;
use std::ops::Range;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

const DEFAULT_FILTER: &str = "tenring_decomp=info,tenring_ooc=info";

/// Output format of the installed subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Multi-line human-readable events
    #[default]
    Pretty,
    /// One line per event
    Compact,
    /// Newline-delimited JSON
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("unknown log format '{}'", other),
        }
    }
}

/// Subscriber configuration
#[derive(Debug, Clone)]
pub struct TracingConfig {
    pub format: LogFormat,
    /// `EnvFilter` directive
    pub filter: String,
    pub ansi: bool,
}

impl TracingConfig {
    /// Read `TENRING_LOG_FORMAT` and `RUST_LOG`
    ///
    /// An unrecognised format falls back to pretty output.
    pub fn from_env() -> Self {
        let format = std::env::var("TENRING_LOG_FORMAT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();
        let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_FILTER.to_string());
        Self {
            format,
            filter,
            ansi: true,
        }
    }

    /// Override the output format
    pub fn format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Override the filter directive
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

/// Install the global subscriber
///
/// Fails on a malformed filter or when a global subscriber already exists.
pub fn init_tracing(config: TracingConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter)?;

    let layer: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Pretty => fmt::layer().pretty().with_ansi(config.ansi).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_ansi(config.ansi).boxed(),
        LogFormat::Json => fmt::layer().json().boxed(),
    };

    tracing_subscriber::registry()
        .with(layer.with_filter(filter))
        .try_init()?;
    Ok(())
}

/// Emit the event for one slab read along `mode`
pub fn record_slab_read(path: &Path, mode: usize, range: Range<usize>, bytes: usize, elapsed: Duration) {
    tracing::debug!(
        path = %path.display(),
        mode,
        start = range.start,
        end = range.end,
        bytes,
        elapsed_us = elapsed.as_micros() as u64,
        "slab read"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!(" Compact ".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_builder_overrides() {
        let config = TracingConfig::from_env()
            .format(LogFormat::Json)
            .filter("tenring_decomp=trace");
        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.filter, "tenring_decomp=trace");
    }

    #[test]
    fn test_bad_filter_rejected() {
        let config = TracingConfig::from_env().filter("tenring_decomp=loud");
        assert!(init_tracing(config).is_err());
    }

    #[test]
    fn test_slab_event_without_subscriber() {
        record_slab_read(Path::new("/tmp/x.bin"), 1, 0..4, 2048, Duration::from_micros(30));
    }
}
