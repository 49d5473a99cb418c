//! ChargeWatch Engine - hardware access and slot state core
//!
//! Layers, leaves first:
//!
//! - [`bridge`]: CP2112 command set over a [`HidTransport`](chargewatch_hid_common::HidTransport),
//!   exposed as an [`I2cBus`].
//! - [`expander`]: MCP23017 register client producing 16-bit [`PortSnapshot`]s.
//! - [`slots`]: pin map, LED decode table and the per-slot debounce state machine.
//! - [`notifier`]: the edge detector that turns FULL transitions into notifications.
//! - [`link`]: device ownership with reconnect and fault backoff.
//! - [`poller`]: the scheduled poll loop publishing immutable [`SlotSnapshot`]s.

#![deny(static_mut_refs)]
#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

pub mod bridge;
pub mod device;
pub mod expander;
pub mod link;
pub mod notifier;
pub mod poller;
pub mod ports;
pub mod slots;
pub mod snapshot;
#[cfg(any(test, feature = "harness"))]
pub mod sim;

pub use bridge::{BridgeConfig, Cp2112Bridge};
pub use device::{HidApiConnector, open_charger};
pub use expander::{MCP23017_ADDRESS, Mcp23017, PortSnapshot};
pub use link::{Backoff, ChargerLink};
pub use notifier::{Notification, NotifierGate, Notifier, NotifyError};
pub use poller::{CycleOutcome, Poller, PollerConfig, SlotMonitor};
pub use ports::{DeviceConnector, I2cBus, PortSource};
pub use slots::{PinMap, PinPair, SLOT_COUNT, SlotEngine, SlotState, TransitionEvent, decode};
pub use snapshot::{LinkStatus, SlotSnapshot, SnapshotPublisher, SnapshotReader, snapshot_channel};
