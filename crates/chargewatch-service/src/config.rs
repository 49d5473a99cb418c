//! Daemon configuration
//!
//! One JSON file, `config.json` next to the executable unless `--config`
//! says otherwise. Every field is optional and read on its own: a field
//! that is null, of the wrong type or out of range keeps its default and
//! the rest of the file still applies. A missing or unreadable file falls
//! back to defaults with notifications disabled.

use anyhow::{Context, Result};
use chargewatch_engine::{PinMap, PollerConfig};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const CONFIG_FILE_NAME: &str = "config.json";

/// Fastest SMBus clock the bridge supports.
pub const MAX_BUS_SPEED_HZ: u32 = 400_000;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("poll_interval_ms must be at least 1")]
    ZeroPollInterval,

    #[error("debounce_cycles must be at least 1")]
    ZeroDebounce,

    #[error("bus_speed_hz must be between 1 and {MAX_BUS_SPEED_HZ}, got {0}")]
    BusSpeedOutOfRange(u32),

    #[error("host must not be empty")]
    EmptyHost,
}

/// Which port bits belong to which slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PinLayout {
    /// The BC-211 harness: S1..S3 on port B, S4..S6 on port A.
    #[default]
    Bc211,
    /// Slot `i` on bits `2i` and `2i + 1`.
    Sequential,
}

impl PinLayout {
    pub fn pin_map(self) -> PinMap {
        match self {
            Self::Bc211 => PinMap::bc211(),
            Self::Sequential => PinMap::sequential(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// ntfy topic URL. Empty disables notifications.
    pub ntfy_url: String,
    pub host: String,
    pub port: u16,
    pub poll_interval_ms: u64,
    pub debounce_cycles: u32,
    pub bus_speed_hz: u32,
    /// Pick one bridge by USB serial number when several are attached.
    pub serial: Option<String>,
    pub pin_layout: PinLayout,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            ntfy_url: String::new(),
            host: "0.0.0.0".to_string(),
            port: 5000,
            poll_interval_ms: 1000,
            debounce_cycles: 2,
            bus_speed_hz: 100_000,
            serial: None,
            pin_layout: PinLayout::default(),
        }
    }
}

/// Values given on the command line. `None` keeps the file's value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub ntfy_url: Option<String>,
    pub serial: Option<String>,
}

impl ServiceConfig {
    /// `config.json` in the directory holding the running executable.
    pub fn default_config_path() -> Result<PathBuf> {
        let exe = std::env::current_exe().context("Failed to locate the running executable")?;
        let dir = exe
            .parent()
            .with_context(|| format!("Executable path has no parent: {}", exe.display()))?;
        Ok(dir.join(CONFIG_FILE_NAME))
    }

    /// Read and parse `path`. A missing file is not an error and yields
    /// the defaults.
    pub async fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            info!(path = %path.display(), "Config file not found, using defaults (notifications disabled)");
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        let Value::Object(fields) = value else {
            anyhow::bail!("Config file is not a JSON object: {}", path.display());
        };

        let config = Self::from_fields(fields);
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Apply every usable field over the defaults.
    fn from_fields(mut fields: Map<String, Value>) -> Self {
        let mut config = Self::default();

        if let Some(url) = take_field::<String>(&mut fields, "ntfy_url", |_| true) {
            config.ntfy_url = url;
        }
        if let Some(host) = take_field::<String>(&mut fields, "host", |h| !h.trim().is_empty()) {
            config.host = host.trim().to_string();
        }
        if let Some(port) = take_field::<u16>(&mut fields, "port", |_| true) {
            config.port = port;
        }
        if let Some(ms) = take_field::<u64>(&mut fields, "poll_interval_ms", |ms| *ms > 0) {
            config.poll_interval_ms = ms;
        }
        if let Some(n) = take_field::<u32>(&mut fields, "debounce_cycles", |n| *n > 0) {
            config.debounce_cycles = n;
        }
        if let Some(hz) = take_field::<u32>(&mut fields, "bus_speed_hz", |hz| {
            (1..=MAX_BUS_SPEED_HZ).contains(hz)
        }) {
            config.bus_speed_hz = hz;
        }
        if let Some(serial) = take_field::<String>(&mut fields, "serial", |s| !s.trim().is_empty()) {
            config.serial = Some(serial.trim().to_string());
        }
        if let Some(layout) = take_field::<PinLayout>(&mut fields, "pin_layout", |_| true) {
            config.pin_layout = layout;
        }

        for key in fields.keys() {
            debug!(field = %key, "Ignoring unknown config field");
        }
        config
    }

    /// Like [`load_from_path`](Self::load_from_path) but never fails: any
    /// problem is logged and the defaults are used.
    pub async fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match Self::load_from_path(path).await {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %format!("{e:#}"), "Config unusable, using defaults (notifications disabled)");
                Self::default()
            }
        }
    }

    pub fn with_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(host) = overrides.host {
            self.host = host.trim().to_string();
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(url) = overrides.ntfy_url {
            self.ntfy_url = url;
        }
        if overrides.serial.is_some() {
            self.serial = overrides.serial;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.debounce_cycles == 0 {
            return Err(ConfigError::ZeroDebounce);
        }
        if self.bus_speed_hz == 0 || self.bus_speed_hz > MAX_BUS_SPEED_HZ {
            return Err(ConfigError::BusSpeedOutOfRange(self.bus_speed_hz));
        }
        if self.host.trim().is_empty() {
            return Err(ConfigError::EmptyHost);
        }
        if !self.ntfy_url.trim().is_empty() && self.notification_url().is_none() {
            warn!(url = %self.ntfy_url, "ntfy_url is not an http(s) URL, notifications disabled");
        }
        Ok(())
    }

    /// The notification endpoint, if notifications are enabled.
    pub fn notification_url(&self) -> Option<&str> {
        let url = self.ntfy_url.trim();
        (url.starts_with("http://") || url.starts_with("https://")).then_some(url)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            interval: self.poll_interval(),
            debounce_cycles: self.debounce_cycles,
            pin_map: self.pin_layout.pin_map(),
        }
    }
}

/// Remove `key` and decode it. Null means "not set"; a value that does not
/// decode or fails `valid` is logged and dropped.
fn take_field<T: DeserializeOwned>(
    fields: &mut Map<String, Value>,
    key: &str,
    valid: impl FnOnce(&T) -> bool,
) -> Option<T> {
    let raw = fields.remove(key)?;
    if raw.is_null() {
        return None;
    }
    match serde_json::from_value::<T>(raw.clone()) {
        Ok(value) if valid(&value) => Some(value),
        Ok(_) => {
            warn!(field = key, value = %raw, "Config value out of range, using default");
            None
        }
        Err(e) => {
            warn!(field = key, value = %raw, error = %e, "Config value unusable, using default");
            None
        }
    }
}
