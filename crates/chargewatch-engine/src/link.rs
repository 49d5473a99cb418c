//! Device ownership, reconnect and fault backoff
//!
//! A device-level failure (unplug, HID I/O error) gets exactly one
//! reconnect within the same cycle. If that fails the link is `Faulted` and
//! only tries again once its backoff has elapsed. Bus-level failures are
//! passed straight through; they never cause a reconnect.

use crate::expander::PortSnapshot;
use crate::ports::{DeviceConnector, PortSource};
use crate::snapshot::LinkStatus;
use chargewatch_errors::{ChargeWatchError, DeviceError, Result};
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Exponential delay, doubling from `initial` up to `max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub const DEFAULT_MAX: Duration = Duration::from_secs(30);

    pub fn new(initial: Duration, max: Duration) -> Self {
        let initial = initial.min(max);
        Self {
            initial,
            max,
            current: initial,
        }
    }

    /// Delay to wait now; the following call returns double.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self.current.saturating_mul(2).min(self.max);
        delay
    }

    pub fn reset(&mut self) {
        self.current = self.initial;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Self::DEFAULT_MAX)
    }
}

pub struct ChargerLink {
    connector: Box<dyn DeviceConnector>,
    source: Option<Box<dyn PortSource>>,
    status: LinkStatus,
    backoff: Backoff,
    retry_at: Option<Instant>,
    last_error: Option<String>,
}

impl ChargerLink {
    /// A link that has not connected yet. The first `read_port` connects.
    pub fn new(connector: Box<dyn DeviceConnector>, backoff: Backoff) -> Self {
        Self {
            connector,
            source: None,
            status: LinkStatus::Connecting,
            backoff,
            retry_at: None,
            last_error: None,
        }
    }

    /// A link around a device that was already opened and initialised.
    pub fn connected(
        connector: Box<dyn DeviceConnector>,
        source: Box<dyn PortSource>,
        backoff: Backoff,
    ) -> Self {
        Self {
            connector,
            source: Some(source),
            status: LinkStatus::Connected,
            backoff,
            retry_at: None,
            last_error: None,
        }
    }

    pub fn status(&self) -> LinkStatus {
        self.status
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Open and initialise now, ignoring any backoff.
    pub fn connect(&mut self) -> Result<()> {
        let source = self.connector.connect()?;
        info!(device = %self.connector.describe(), "Charger link connected");
        self.source = Some(source);
        self.status = LinkStatus::Connected;
        self.retry_at = None;
        self.last_error = None;
        self.backoff.reset();
        Ok(())
    }

    fn fault(&mut self, now: Instant, err: &ChargeWatchError) {
        let delay = self.backoff.next_delay();
        error!(
            device = %self.connector.describe(),
            error = %err,
            severity = %err.severity(),
            retry_in_ms = delay.as_millis() as u64,
            "Charger link faulted"
        );
        self.source = None;
        self.status = LinkStatus::Faulted;
        self.retry_at = Some(now + delay);
        self.last_error = Some(err.to_string());
    }

    /// Reconnect and read once; faults the link if either step fails at
    /// the device level.
    fn reconnect_and_read(&mut self, now: Instant) -> Result<PortSnapshot> {
        if let Err(e) = self.connect() {
            self.fault(now, &e);
            return Err(e);
        }
        self.read_connected(now, false)
    }

    fn read_connected(&mut self, now: Instant, may_reconnect: bool) -> Result<PortSnapshot> {
        let Some(source) = self.source.as_mut() else {
            return self.reconnect_and_read(now);
        };
        match source.read_port() {
            Ok(port) => Ok(port),
            Err(e) if e.requires_reconnect() && may_reconnect => {
                warn!(error = %e, "Device error, reconnecting once");
                self.source = None;
                self.reconnect_and_read(now)
            }
            Err(e) if e.requires_reconnect() => {
                self.fault(now, &e);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Read the port, reconnecting as described in the module docs. `now`
    /// is the cycle's start time.
    pub fn read_port(&mut self, now: Instant) -> Result<PortSnapshot> {
        if self.source.is_some() {
            return self.read_connected(now, true);
        }

        if let Some(retry_at) = self.retry_at
            && now < retry_at
        {
            let wait_ms = retry_at.duration_since(now).as_millis();
            return Err(DeviceError::disconnected(format!(
                "charger link faulted, next reconnect in {wait_ms}ms"
            ))
            .into());
        }

        if self.status == LinkStatus::Faulted {
            info!(device = %self.connector.describe(), "Retrying faulted charger link");
        }
        self.reconnect_and_read(now)
    }
}

impl std::fmt::Debug for ChargerLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChargerLink")
            .field("device", &self.connector.describe())
            .field("status", &self.status)
            .field("retry_at", &self.retry_at)
            .finish()
    }
}
