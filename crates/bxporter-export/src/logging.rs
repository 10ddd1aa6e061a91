//! Logging and tracing utilities for bXporter
//!
//! Structured logging uses the `tracing` crate. Library code only emits
//! events; installing a subscriber is left to the binary, through
//! [`init_with_config`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Whether tracing has been initialized
static TRACING_INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Install a `fmt` subscriber for `config`
///
/// `RUST_LOG` takes precedence over `config.default_level` when set.
/// Only the first call installs anything.
pub fn init_with_config(config: TracingConfig) {
    if TRACING_INITIALIZED
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::Relaxed)
        .is_ok()
    {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.default_level));

        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(config.show_target)
            .with_thread_ids(config.show_thread_ids)
            .with_file(config.show_file)
            .with_line_number(config.show_line_number);

        // A subscriber installed elsewhere wins; ours is dropped silently
        let _ = tracing_subscriber::registry()
            .with(fmt_layer)
            .with(filter)
            .try_init();
    }
}

/// Configuration for tracing initialization
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Default log level filter (e.g., "info", "debug", "warn")
    pub default_level: String,
    /// Show the target (module path) in log output
    pub show_target: bool,
    /// Show thread IDs in log output
    pub show_thread_ids: bool,
    /// Show source file in log output
    pub show_file: bool,
    /// Show line number in log output
    pub show_line_number: bool,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            default_level: "warn,bxporter=info".to_string(),
            show_target: true,
            show_thread_ids: false,
            show_file: false,
            show_line_number: false,
        }
    }
}

impl TracingConfig {
    /// Map a `-v` count onto a filter and output detail
    ///
    /// 0 is warnings only. From 2 targets are shown, from 3 thread ids and
    /// source locations as well.
    pub fn for_verbosity(verbosity: u8) -> Self {
        let default_level = match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        Self {
            default_level: default_level.to_string(),
            show_target: verbosity >= 2,
            show_thread_ids: verbosity >= 3,
            show_file: verbosity >= 3,
            show_line_number: verbosity >= 3,
        }
    }
}

/// Log the size of a collected registry
#[macro_export]
macro_rules! log_collection_size {
    ($kind:expr, $registry:expr) => {
        tracing::info!(kind = %$kind, count = $registry.len(), "Collected");
    };
}

/// Log the start of an encoded section
#[macro_export]
macro_rules! log_section {
    ($format:expr, $kind:expr, $count:expr) => {
        tracing::info!(format = %$format, section = %$kind, count = $count, "Writing section");
    };
}

/// Run `f` inside an `export` span, reporting its duration at debug level
/// or at info level when `report` is set
pub fn instrument_stage<T, F>(name: &str, report: bool, f: F) -> T
where
    F: FnOnce() -> T,
{
    let span = tracing::info_span!("export", stage = %name);
    let _guard = span.enter();

    let start = Instant::now();
    let result = f();
    let duration = start.elapsed();

    if report {
        tracing::info!(duration_ms = %duration.as_millis(), "{} time", name);
    } else {
        tracing::debug!(duration_ms = %duration.as_millis(), "{} complete", name);
    }

    result
}

/// Log progress through a long section
pub fn log_progress(current: usize, total: usize) {
    if total > 0 && (current % 1000 == 0 || current == total) {
        let percent = (current as f64 / total as f64 * 100.0) as u32;
        tracing::debug!(current = %current, total = %total, percent = %percent, "Progress");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracing_config_default() {
        let config = TracingConfig::default();
        assert!(config.default_level.contains("info"));
        assert!(config.show_target);
        assert!(!config.show_thread_ids);
    }

    #[test]
    fn test_instrument_stage() {
        let result = instrument_stage("collect", false, || 42);
        assert_eq!(result, 42);
    }

    #[test]
    fn test_verbosity_levels() {
        assert_eq!(TracingConfig::for_verbosity(0).default_level, "warn");
        assert_eq!(TracingConfig::for_verbosity(2).default_level, "debug");

        let trace = TracingConfig::for_verbosity(5);
        assert_eq!(trace.default_level, "trace");
        assert!(trace.show_file && trace.show_line_number);
        assert!(!TracingConfig::for_verbosity(1).show_target);
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init_with_config(TracingConfig::default());
        init_with_config(TracingConfig::for_verbosity(2));
    }
}
