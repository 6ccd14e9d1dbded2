//! Tracing subscriber setup for binaries and demos embedding the pipeline.
//!
//! Library code only emits `tracing` events; installing a subscriber is left
//! to the application.

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::error::{RagError, Result};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Install a global subscriber filtered by `RUST_LOG`, falling back to `default_filter`.
///
/// # Errors
///
/// Returns [`RagError::ConfigError`] if the filter does not parse or a global
/// subscriber is already installed.
pub fn init_tracing(default_filter: &str, format: LogFormat) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter).map_err(|e| {
            RagError::ConfigError(format!("invalid log filter '{default_filter}': {e}"))
        })?,
    };

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match format {
        LogFormat::Pretty => {
            registry.with(tracing_subscriber::fmt::layer().with_target(false)).try_init()
        }
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).try_init(),
    };
    installed
        .map_err(|e| RagError::ConfigError(format!("failed to install tracing subscriber: {e}")))
}
