//! Immutable slot snapshots and their publication channel
//!
//! The poll loop swaps in a fresh `Arc<SlotSnapshot>` after every cycle;
//! readers clone the `Arc` and never see a partially updated set of slots.

use crate::expander::PortSnapshot;
use crate::slots::{PinMap, SLOT_COUNT, SlotState};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkStatus {
    #[default]
    Connecting,
    Connected,
    /// Reconnect failed; waiting out the backoff.
    Faulted,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotSnapshot {
    pub states: [SlotState; SLOT_COUNT],
    /// Pin levels the states were decoded from.
    pub port: Option<PortSnapshot>,
    pub pin_map: PinMap,
    /// Time of the last successful read.
    pub updated_at: Option<DateTime<Utc>>,
    /// Time of the last poll attempt, successful or not.
    pub checked_at: Option<DateTime<Utc>>,
    /// The last poll failed; states are from an earlier read.
    pub stale: bool,
    pub link: LinkStatus,
    pub error: Option<String>,
}

impl SlotSnapshot {
    pub fn initial(pin_map: PinMap) -> Self {
        Self {
            states: [SlotState::Unknown; SLOT_COUNT],
            port: None,
            pin_map,
            updated_at: None,
            checked_at: None,
            stale: false,
            link: LinkStatus::Connecting,
            error: None,
        }
    }

    /// Successor after a successful read.
    pub fn refreshed(
        &self,
        states: [SlotState; SLOT_COUNT],
        port: PortSnapshot,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            states,
            port: Some(port),
            pin_map: self.pin_map,
            updated_at: Some(at),
            checked_at: Some(at),
            stale: false,
            link: LinkStatus::Connected,
            error: None,
        }
    }

    /// Successor after a failed read: slot data kept, marked stale.
    pub fn failed(&self, link: LinkStatus, error: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            checked_at: Some(at),
            stale: true,
            link,
            error: Some(error.into()),
            ..self.clone()
        }
    }

    pub fn has_reading(&self) -> bool {
        self.updated_at.is_some()
    }

    /// `false` when the device is faulted, or when nothing was ever read
    /// and the last attempt failed.
    pub fn is_available(&self) -> bool {
        match self.link {
            LinkStatus::Faulted => false,
            _ => self.has_reading() || self.error.is_none(),
        }
    }

    /// Raw levels of one slot's (charging, full) lines from the last read.
    pub fn led_levels(&self, slot: usize) -> Option<(bool, bool)> {
        let port = self.port?;
        Some(self.pin_map.pair(slot)?.levels(port))
    }

    /// `S1=EMPTY, S2=CHARGING, ...`
    pub fn summary(&self) -> String {
        summarize(&self.states)
    }
}

pub fn summarize(states: &[SlotState; SLOT_COUNT]) -> String {
    states
        .iter()
        .enumerate()
        .map(|(i, s)| format!("S{}={s}", i + 1))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Write side, owned by the poll loop.
#[derive(Debug)]
pub struct SnapshotPublisher {
    tx: watch::Sender<Arc<SlotSnapshot>>,
}

/// Read side; cheap to clone, never blocks on the poll loop.
#[derive(Debug, Clone)]
pub struct SnapshotReader {
    rx: watch::Receiver<Arc<SlotSnapshot>>,
}

pub fn snapshot_channel(initial: SlotSnapshot) -> (SnapshotPublisher, SnapshotReader) {
    let (tx, rx) = watch::channel(Arc::new(initial));
    (SnapshotPublisher { tx }, SnapshotReader { rx })
}

impl SnapshotPublisher {
    pub fn publish(&self, snapshot: SlotSnapshot) -> Arc<SlotSnapshot> {
        let snapshot = Arc::new(snapshot);
        self.tx.send_replace(snapshot.clone());
        snapshot
    }

    pub fn subscribe(&self) -> SnapshotReader {
        SnapshotReader {
            rx: self.tx.subscribe(),
        }
    }
}

impl SnapshotReader {
    /// Most recently published snapshot.
    pub fn get_snapshot(&self) -> Arc<SlotSnapshot> {
        self.rx.borrow().clone()
    }

    /// Wait for the next publication. Returns `None` once the poll loop
    /// has gone away.
    pub async fn changed(&mut self) -> Option<Arc<SlotSnapshot>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_keeps_states_and_marks_stale() {
        let now = Utc::now();
        let ok = SlotSnapshot::initial(PinMap::bc211()).refreshed(
            [SlotState::Empty; SLOT_COUNT],
            PortSnapshot::new(0xFFFF),
            now,
        );
        let failed = ok.failed(LinkStatus::Connected, "bus timeout", now);

        assert_eq!(failed.states, ok.states);
        assert_eq!(failed.port, ok.port);
        assert_eq!(failed.updated_at, ok.updated_at);
        assert!(failed.stale);
        assert!(failed.is_available());
        assert_eq!(failed.error.as_deref(), Some("bus timeout"));
    }

    #[test]
    fn test_availability() {
        let now = Utc::now();
        let initial = SlotSnapshot::initial(PinMap::bc211());
        assert!(initial.is_available());
        assert!(!initial.failed(LinkStatus::Connected, "nack", now).is_available());
        assert!(!initial.failed(LinkStatus::Faulted, "gone", now).is_available());
    }

    #[test]
    fn test_summary_lists_all_slots() {
        let mut states = [SlotState::Empty; SLOT_COUNT];
        states[4] = SlotState::Full;
        assert_eq!(
            summarize(&states),
            "S1=EMPTY, S2=EMPTY, S3=EMPTY, S4=EMPTY, S5=FULL, S6=EMPTY"
        );
    }

    #[test]
    fn test_led_levels_follow_pin_map() {
        let snap = SlotSnapshot::initial(PinMap::bc211()).refreshed(
            [SlotState::Empty; SLOT_COUNT],
            PortSnapshot::from_ports(0xFF, 0xFE),
            Utc::now(),
        );
        assert_eq!(snap.led_levels(0), Some((false, true)));
        assert_eq!(snap.led_levels(3), Some((true, true)));
        assert_eq!(snap.led_levels(6), None);
    }

    #[tokio::test]
    async fn test_reader_sees_whole_snapshots() {
        let (publisher, mut reader) = snapshot_channel(SlotSnapshot::initial(PinMap::bc211()));
        assert_eq!(reader.get_snapshot().states, [SlotState::Unknown; SLOT_COUNT]);

        let next = SlotSnapshot::initial(PinMap::bc211()).refreshed(
            [SlotState::Charging; SLOT_COUNT],
            PortSnapshot::new(0x0000),
            Utc::now(),
        );
        publisher.publish(next.clone());

        let seen = reader.changed().await;
        assert_eq!(seen.as_deref(), Some(&next));
        assert_eq!(*reader.get_snapshot(), next);
    }
}
