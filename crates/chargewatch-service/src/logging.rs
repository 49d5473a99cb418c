//! Tracing subscriber setup

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `-v` count: 0 info, 1 debug, 2+ trace for the chargewatch crates.
    pub verbosity: u8,
    /// One JSON object per line instead of the human format.
    pub json: bool,
}

impl LoggingConfig {
    /// Filter used when `RUST_LOG` is not set.
    pub fn default_directive(&self) -> String {
        let level = match self.verbosity {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        format!(
            "warn,chargewatchd={level},chargewatch_service={level},chargewatch_engine={level},\
             chargewatch_hid_common={level}"
        )
    }
}

/// Install the global subscriber. Fails if one is already set.
pub fn init_logging(config: LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive()));

    let fmt_layer = if config.json {
        fmt::layer().json().with_current_span(false).boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    info!(verbosity = config.verbosity, json = config.json, "Logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_raises_level() {
        let quiet = LoggingConfig::default().default_directive();
        assert!(quiet.contains("chargewatch_engine=info"));

        let loud = LoggingConfig {
            verbosity: 3,
            json: false,
        }
        .default_directive();
        assert!(loud.contains("chargewatch_engine=trace"));
        assert!(loud.starts_with("warn,"));
    }

    #[test]
    fn test_directive_parses() {
        let directive = LoggingConfig {
            verbosity: 1,
            json: true,
        }
        .default_directive();
        assert!(EnvFilter::try_new(directive).is_ok());
    }
}
