//! Subscriber initialization.
//!
//! Filtering comes from `RUST_LOG` with an `info` fallback. Embedders that
//! already installed a global subscriber are left alone: initialization is
//! idempotent and never panics.

use tracing_subscriber::EnvFilter;

/// Output format for process logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// One JSON object per line, for log shippers.
    #[default]
    Json,
    /// Human-readable output for local development.
    Pretty,
}

/// Initialize tracing with the default (JSON) format.
pub fn init() {
    init_with(LogFormat::default(), "info");
}

/// Initialize tracing with an explicit format and fallback filter.
///
/// `RUST_LOG` wins over `default_filter` when set. Safe to call more than
/// once; later calls are no-ops.
pub fn init_with(format: LogFormat, default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_timer(tracing_subscriber::fmt::time::SystemTime);
    let result = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
    let _ = result;
}
