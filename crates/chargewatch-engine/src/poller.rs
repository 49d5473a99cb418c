//! The poll loop
//!
//! [`SlotMonitor`] is the synchronous heart: it takes the outcome of one port
//! read and produces the next snapshot plus any committed transitions.
//! [`Poller`] drives it from a Tokio interval, doing the blocking bus work on
//! the blocking pool while holding the link lock only for that read.

use crate::expander::PortSnapshot;
use crate::link::ChargerLink;
use crate::notifier::NotifierGate;
use crate::slots::{PinMap, SlotEngine, TransitionEvent};
use crate::snapshot::{LinkStatus, SlotSnapshot, SnapshotPublisher, SnapshotReader, snapshot_channel};
use chargewatch_errors::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollerConfig {
    pub interval: Duration,
    pub debounce_cycles: u32,
    pub pin_map: PinMap,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(1),
            debounce_cycles: 2,
            pin_map: PinMap::bc211(),
        }
    }
}

/// Result of one poll cycle.
#[derive(Debug, Clone)]
pub struct CycleOutcome {
    pub snapshot: Arc<SlotSnapshot>,
    pub events: Vec<TransitionEvent>,
}

/// Debounce engine plus the current snapshot.
#[derive(Debug)]
pub struct SlotMonitor {
    engine: SlotEngine,
    current: SlotSnapshot,
}

impl SlotMonitor {
    pub fn new(pin_map: PinMap, debounce_cycles: u32) -> Self {
        Self {
            engine: SlotEngine::new(pin_map, debounce_cycles),
            current: SlotSnapshot::initial(pin_map),
        }
    }

    pub fn snapshot(&self) -> &SlotSnapshot {
        &self.current
    }

    pub fn engine(&self) -> &SlotEngine {
        &self.engine
    }

    /// Fold one read outcome in. A failed read leaves every slot as it was
    /// and does not touch the debounce counters.
    pub fn apply(
        &mut self,
        read: Result<PortSnapshot>,
        link: LinkStatus,
        at: DateTime<Utc>,
    ) -> (SlotSnapshot, Vec<TransitionEvent>) {
        match read {
            Ok(port) => {
                let events = self.engine.observe(port, at);
                self.current = self.current.refreshed(self.engine.states(), port, at);
                debug!(port = %port, "Poll cycle ok");
                (self.current.clone(), events)
            }
            Err(e) => {
                warn!(
                    error = %e,
                    category = %e.category(),
                    severity = %e.severity(),
                    "Poll cycle failed, snapshot marked stale"
                );
                self.current = self.current.failed(link, e.to_string(), at);
                (self.current.clone(), Vec::new())
            }
        }
    }
}

pub struct Poller {
    link: Arc<Mutex<ChargerLink>>,
    monitor: SlotMonitor,
    publisher: SnapshotPublisher,
    gate: NotifierGate,
    interval: Duration,
}

impl Poller {
    pub fn new(link: ChargerLink, config: PollerConfig, gate: NotifierGate) -> (Self, SnapshotReader) {
        let monitor = SlotMonitor::new(config.pin_map, config.debounce_cycles);
        let (publisher, reader) = snapshot_channel(monitor.snapshot().clone());
        let poller = Self {
            link: Arc::new(Mutex::new(link)),
            monitor,
            publisher,
            gate,
            interval: config.interval,
        };
        (poller, reader)
    }

    pub fn reader(&self) -> SnapshotReader {
        self.publisher.subscribe()
    }

    pub fn link_status(&self) -> LinkStatus {
        self.link.lock().status()
    }

    /// One full cycle: read, decode, publish, notify.
    pub async fn run_once(&mut self) -> CycleOutcome {
        let link = Arc::clone(&self.link);
        let started = Instant::now();
        let read = tokio::task::spawn_blocking(move || {
            let mut link = link.lock();
            let read = link.read_port(started);
            (read, link.status())
        })
        .await;

        let (read, status) = match read {
            Ok(pair) => pair,
            Err(e) => (
                Err(std::io::Error::other(format!("poll task failed: {e}")).into()),
                self.link_status(),
            ),
        };

        let (snapshot, events) = self.monitor.apply(read, status, Utc::now());
        let snapshot = self.publisher.publish(snapshot);
        drop(self.gate.dispatch(&events, &snapshot.states));

        CycleOutcome { snapshot, events }
    }

    /// Poll on the configured interval until `shutdown` fires. A cycle in
    /// progress always finishes first.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        let mut ticker = interval(self.interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(interval_ms = self.interval.as_millis() as u64, "Poll loop started");

        loop {
            tokio::select! {
                _ = shutdown.recv() => break,
                _ = ticker.tick() => {
                    self.run_once().await;
                }
            }
        }

        info!("Poll loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slots::{SLOT_COUNT, SlotState};
    use chargewatch_errors::BusError;

    #[test]
    fn test_failed_read_keeps_slots_and_counters() {
        let map = PinMap::sequential();
        let mut monitor = SlotMonitor::new(map, 2);
        let empty = map.encode(&[SlotState::Empty; SLOT_COUNT]);
        let now = Utc::now();

        monitor.apply(Ok(empty), LinkStatus::Connected, now);
        let (snap, _) = monitor.apply(Ok(empty), LinkStatus::Connected, now);
        assert_eq!(snap.states, [SlotState::Empty; SLOT_COUNT]);

        let mut full = [SlotState::Empty; SLOT_COUNT];
        full[0] = SlotState::Full;
        let full = map.encode(&full);

        monitor.apply(Ok(full), LinkStatus::Connected, now);
        let (stale, events) = monitor.apply(
            Err(BusError::timeout(0x20, 50).into()),
            LinkStatus::Connected,
            now,
        );
        assert!(stale.stale);
        assert!(events.is_empty());
        assert_eq!(stale.states, [SlotState::Empty; SLOT_COUNT]);

        // The earlier FULL read still counts toward the debounce.
        let (snap, events) = monitor.apply(Ok(full), LinkStatus::Connected, now);
        assert!(!snap.stale);
        assert_eq!(events.len(), 1);
        assert_eq!(snap.states[0], SlotState::Full);
    }

    #[test]
    #[tracing_test::traced_test]
    fn test_faulted_read_is_unavailable_and_classified_in_logs() {
        let mut monitor = SlotMonitor::new(PinMap::bc211(), 2);
        let (snap, events) = monitor.apply(
            Err(chargewatch_errors::DeviceError::disconnected("usb bridge").into()),
            LinkStatus::Faulted,
            Utc::now(),
        );
        assert_eq!(snap.link, LinkStatus::Faulted);
        assert!(!snap.is_available());
        assert!(events.is_empty());
        assert!(logs_contain("category=Device"));
        assert!(logs_contain("severity=CRITICAL"));
    }

    #[test]
    fn test_run_once_against_simulated_charger() {
        use crate::link::Backoff;
        use crate::sim::SimHandle;

        let sim = SimHandle::new();
        let map = PinMap::bc211();
        let mut states = [SlotState::Empty; SLOT_COUNT];
        states[3] = SlotState::Full;
        sim.set_states(&map, &states);

        let link = ChargerLink::new(Box::new(sim.connector()), Backoff::default());
        let config = PollerConfig {
            debounce_cycles: 1,
            ..PollerConfig::default()
        };
        let (mut poller, reader) = Poller::new(link, config, NotifierGate::disabled());

        let outcome = tokio_test::block_on(poller.run_once());
        assert_eq!(outcome.events.len(), SLOT_COUNT);
        assert_eq!(reader.get_snapshot().states, states);
        assert_eq!(poller.link_status(), LinkStatus::Connected);
    }
}
