//! Structured logging for AeroMesh nodes.
//!
//! Field nodes log to stderr in a compact human format; gateways that ship
//! logs to an aggregator use the JSON variant. Both honour `RUST_LOG`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter applied when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info";

/// Output format for [`init_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable single-line records
    Pretty,
    /// One JSON object per record
    Json,
}

impl LogFormat {
    /// Parse a format name as written in config or on the command line.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Some(Self::Pretty),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Build the env filter, falling back to `default_directive`.
pub fn env_filter(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Initialize the human-readable logger.
///
/// # Example
/// ```no_run
/// use aeromesh_core::logging;
///
/// logging::init();
/// tracing::info!("node started");
/// ```
pub fn init() {
    init_with(LogFormat::Pretty, DEFAULT_FILTER);
}

/// Initialize the JSON logger for log aggregation.
pub fn init_json() {
    init_with(LogFormat::Json, DEFAULT_FILTER);
}

/// Initialize logging with an explicit format and fallback filter.
///
/// A second call in the same process is a no-op rather than a panic, so test
/// harnesses and embedding applications can call it freely.
pub fn init_with(format: LogFormat, default_directive: &str) {
    let filter = env_filter(default_directive);
    let registry = tracing_subscriber::registry().with(filter);

    let result = match format {
        LogFormat::Pretty => registry
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(true))
            .try_init(),
    };

    if result.is_err() {
        tracing::debug!("global subscriber already installed");
    }
}
