//! Logging setup for Airgate
//!
//! Structured `tracing` output, as text for terminals or JSON for log
//! collectors.

use airgate_config::{LogFormat, TelemetryConfig};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Build the level filter: `RUST_LOG` wins, then the configured directive
///
/// # Errors
///
/// Returns an error if the configured directive does not parse
pub fn filter(config: &TelemetryConfig) -> anyhow::Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }

    EnvFilter::try_new(&config.filter).map_err(|e| anyhow::anyhow!("invalid log filter '{}': {e}", config.filter))
}

/// Install the global subscriber
///
/// # Errors
///
/// Returns an error for an invalid filter or when a subscriber is already installed
pub fn init(config: &TelemetryConfig) -> anyhow::Result<()> {
    let filter = filter(config)?;

    let result = match config.format {
        LogFormat::Text => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false);

            tracing_subscriber::registry().with(filter).with(fmt_layer).try_init()
        }
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .flatten_event(true)
                .with_current_span(false)
                .with_target(true);

            tracing_subscriber::registry().with(filter).with(fmt_layer).try_init()
        }
    };

    result.map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))
}
