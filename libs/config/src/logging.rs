//! Tracing subscriber bootstrap for binaries
//!
//! Library crates only emit events; whoever owns `main` decides where they go.

use anyhow::{anyhow, Context, Result};
use tracing_subscriber::EnvFilter;

/// Output format for the fmt subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// One JSON object per event, for log shippers
    Json,
}

/// Install a fmt subscriber writing to stderr. `RUST_LOG` wins over
/// `default_level` when set.
pub fn init_tracing(default_level: &str, format: LogFormat) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_level)
            .with_context(|| format!("Invalid log level '{}'", default_level))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    }
    .map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_subscriber_installs_once() {
        assert_eq!(LogFormat::default(), LogFormat::Text);

        init_tracing("debug", LogFormat::Json).unwrap();
        tracing::info!(pool = "usd-2pool", "json subscriber installed");

        // The global default can only be set once per process
        assert!(init_tracing("debug", LogFormat::Text).is_err());
    }
}
