//! Slot decoding and debounce
//!
//! Each slot owns two active-low LED lines. [`decode`] turns one pair of
//! levels into a [`SlotState`]; [`SlotEngine`] holds the committed state per
//! slot and only moves it after the same decoded state has been seen for
//! `debounce_cycles` consecutive successful reads.

use crate::expander::PortSnapshot;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::info;

pub const SLOT_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlotState {
    /// No successful reading yet.
    #[default]
    Unknown,
    Empty,
    Charging,
    Full,
    /// Both LEDs lit at once.
    Error,
}

impl SlotState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Empty => "EMPTY",
            Self::Charging => "CHARGING",
            Self::Full => "FULL",
            Self::Error => "ERROR",
        }
    }
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decode one slot from its raw line levels (`true` = high = LED off).
pub fn decode(charging_level: bool, full_level: bool) -> SlotState {
    match (charging_level, full_level) {
        (true, true) => SlotState::Empty,
        (false, true) => SlotState::Charging,
        (true, false) => SlotState::Full,
        (false, false) => SlotState::Error,
    }
}

/// Bit positions of one slot's LED lines inside a [`PortSnapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinPair {
    pub charging: u8,
    pub full: u8,
}

impl PinPair {
    pub const fn new(charging: u8, full: u8) -> Self {
        Self { charging, full }
    }

    pub fn levels(self, port: PortSnapshot) -> (bool, bool) {
        (port.level(self.charging), port.level(self.full))
    }
}

/// Which port bits belong to which slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinMap([PinPair; SLOT_COUNT]);

impl PinMap {
    /// BC-211 harness: S1..S3 on GPB0..GPB5, S4..S6 on GPA0..GPA5.
    pub const fn bc211() -> Self {
        Self([
            PinPair::new(8, 9),
            PinPair::new(10, 11),
            PinPair::new(12, 13),
            PinPair::new(0, 1),
            PinPair::new(2, 3),
            PinPair::new(4, 5),
        ])
    }

    /// Slot `i` on bits `2i` and `2i + 1`.
    pub const fn sequential() -> Self {
        Self([
            PinPair::new(0, 1),
            PinPair::new(2, 3),
            PinPair::new(4, 5),
            PinPair::new(6, 7),
            PinPair::new(8, 9),
            PinPair::new(10, 11),
        ])
    }

    pub fn pair(&self, slot: usize) -> Option<PinPair> {
        self.0.get(slot).copied()
    }

    pub fn pairs(&self) -> &[PinPair; SLOT_COUNT] {
        &self.0
    }

    pub fn decode(&self, port: PortSnapshot) -> [SlotState; SLOT_COUNT] {
        self.0.map(|pair| {
            let (charging, full) = pair.levels(port);
            decode(charging, full)
        })
    }

    /// Port value that makes every slot read as `states`. Unknown slots
    /// are left dark (EMPTY); unmapped bits stay high.
    pub fn encode(&self, states: &[SlotState; SLOT_COUNT]) -> PortSnapshot {
        let mut raw: u16 = 0xFFFF;
        for (pair, state) in self.0.iter().zip(states) {
            let (charging_on, full_on) = match state {
                SlotState::Charging => (true, false),
                SlotState::Full => (false, true),
                SlotState::Error => (true, true),
                SlotState::Empty | SlotState::Unknown => (false, false),
            };
            if charging_on {
                raw &= !(1u16 << pair.charging);
            }
            if full_on {
                raw &= !(1u16 << pair.full);
            }
        }
        PortSnapshot::new(raw)
    }
}

impl Default for PinMap {
    fn default() -> Self {
        Self::bc211()
    }
}

/// A committed change of one slot's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEvent {
    /// 0-based slot index.
    pub slot: usize,
    pub previous: SlotState,
    pub current: SlotState,
    pub at: DateTime<Utc>,
}

impl TransitionEvent {
    /// 1-based label as printed on the charger.
    pub fn label(&self) -> String {
        format!("S{}", self.slot + 1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Candidate {
    state: SlotState,
    seen: u32,
}

#[derive(Debug, Clone)]
pub struct SlotEngine {
    pin_map: PinMap,
    debounce_cycles: u32,
    committed: [SlotState; SLOT_COUNT],
    candidates: [Option<Candidate>; SLOT_COUNT],
}

impl SlotEngine {
    /// `debounce_cycles` below 1 is treated as 1.
    pub fn new(pin_map: PinMap, debounce_cycles: u32) -> Self {
        Self {
            pin_map,
            debounce_cycles: debounce_cycles.max(1),
            committed: [SlotState::Unknown; SLOT_COUNT],
            candidates: [None; SLOT_COUNT],
        }
    }

    pub fn pin_map(&self) -> &PinMap {
        &self.pin_map
    }

    pub fn debounce_cycles(&self) -> u32 {
        self.debounce_cycles
    }

    pub fn states(&self) -> [SlotState; SLOT_COUNT] {
        self.committed
    }

    /// Feed one successful read. Returns the transitions committed by it,
    /// in slot order.
    pub fn observe(&mut self, port: PortSnapshot, at: DateTime<Utc>) -> Vec<TransitionEvent> {
        let decoded = self.pin_map.decode(port);
        let mut events = Vec::new();

        for (slot, state) in decoded.into_iter().enumerate() {
            if state == self.committed[slot] {
                self.candidates[slot] = None;
                continue;
            }

            let seen = match self.candidates[slot] {
                Some(c) if c.state == state => c.seen + 1,
                _ => 1,
            };

            if seen >= self.debounce_cycles {
                let previous = self.committed[slot];
                self.committed[slot] = state;
                self.candidates[slot] = None;
                info!(slot = slot + 1, %previous, current = %state, "Slot state committed");
                events.push(TransitionEvent {
                    slot,
                    previous,
                    current: state,
                    at,
                });
            } else {
                self.candidates[slot] = Some(Candidate { state, seen });
            }
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn test_decode_table() {
        assert_eq!(decode(true, true), SlotState::Empty);
        assert_eq!(decode(false, true), SlotState::Charging);
        assert_eq!(decode(true, false), SlotState::Full);
        assert_eq!(decode(false, false), SlotState::Error);
    }

    #[test]
    fn test_all_high_is_all_empty() {
        let states = PinMap::bc211().decode(PortSnapshot::new(0xFFFF));
        assert_eq!(states, [SlotState::Empty; SLOT_COUNT]);
    }

    #[test]
    fn test_bc211_wiring() {
        // S1 red LED on (GPB0 low), S4 green LED on (GPA1 low).
        let port = PortSnapshot::from_ports(0xFF & !0b10, 0xFF & !0b1);
        let states = PinMap::bc211().decode(port);
        assert_eq!(states[0], SlotState::Charging);
        assert_eq!(states[3], SlotState::Full);
        assert_eq!(states[1], SlotState::Empty);
    }

    #[test]
    fn test_encode_inverts_decode() {
        let states = [
            SlotState::Empty,
            SlotState::Charging,
            SlotState::Full,
            SlotState::Error,
            SlotState::Full,
            SlotState::Charging,
        ];
        for map in [PinMap::bc211(), PinMap::sequential()] {
            assert_eq!(map.decode(map.encode(&states)), states);
        }
    }

    #[test]
    fn test_first_commit_needs_full_debounce() {
        let mut engine = SlotEngine::new(PinMap::bc211(), 2);
        let port = PortSnapshot::new(0xFFFF);

        assert!(engine.observe(port, now()).is_empty());
        assert_eq!(engine.states(), [SlotState::Unknown; SLOT_COUNT]);

        let events = engine.observe(port, now());
        assert_eq!(events.len(), SLOT_COUNT);
        assert!(events.iter().all(|e| e.previous == SlotState::Unknown));
        assert_eq!(engine.states(), [SlotState::Empty; SLOT_COUNT]);
    }

    #[test]
    fn test_glitch_resets_candidate() {
        let map = PinMap::sequential();
        let mut engine = SlotEngine::new(map, 2);
        let empty = map.encode(&[SlotState::Empty; SLOT_COUNT]);
        let mut charging = [SlotState::Empty; SLOT_COUNT];
        charging[0] = SlotState::Charging;
        let charging = map.encode(&charging);

        engine.observe(empty, now());
        engine.observe(empty, now());

        assert!(engine.observe(charging, now()).is_empty());
        assert!(engine.observe(empty, now()).is_empty());
        assert!(engine.observe(charging, now()).is_empty());
        let events = engine.observe(charging, now());
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].slot, 0);
        assert_eq!(events[0].current, SlotState::Charging);
        assert_eq!(events[0].label(), "S1");
    }

    #[test]
    fn test_zero_debounce_is_one() {
        let mut engine = SlotEngine::new(PinMap::bc211(), 0);
        assert_eq!(engine.debounce_cycles(), 1);
        assert_eq!(engine.observe(PortSnapshot::new(0xFFFF), now()).len(), SLOT_COUNT);
    }

    #[test]
    fn test_state_serializes_upper_case() -> Result<(), Box<dyn std::error::Error>> {
        assert_eq!(serde_json::to_string(&SlotState::Charging)?, "\"CHARGING\"");
        assert_eq!(SlotState::Unknown.to_string(), "UNKNOWN");
        Ok(())
    }
}
