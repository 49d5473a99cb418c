//! ChargeWatch service - the daemon around the engine
//!
//! Loads the configuration, opens the charger, runs the poll loop and
//! serves the status dashboard. FULL transitions are pushed to ntfy.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod daemon;
pub mod http;
pub mod logging;
pub mod ntfy;

pub use config::{ConfigError, ConfigOverrides, PinLayout, ServiceConfig};
pub use daemon::{DaemonFlags, RunningService, ServiceDaemon};
pub use http::{AppState, SlotStatus, StatusResponse, router};
pub use logging::{LoggingConfig, init_logging};
pub use ntfy::NtfyNotifier;
