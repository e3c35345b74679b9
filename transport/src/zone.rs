use std::sync::atomic::{AtomicU8, Ordering};

use strum::{Display, FromRepr};

use crate::hal::{Level, SenseLines};

/// Where the head sits on the tape, as told by the two tape-hole sensors.
#[repr(u8)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, FromRepr)]
pub enum TapeZone {
    /// Nothing has been sensed since boot.
    #[default]
    Unknown = 0,
    #[strum(to_string = "BOT")]
    Bot = 1,
    #[strum(to_string = "EOT")]
    Eot = 2,
    #[strum(to_string = "EW")]
    EarlyWarning = 3,
    #[strum(to_string = "DATA")]
    Data = 4,
}

impl TapeZone {
    /// Classify the raw sensor levels. Every combination maps to a zone, so `Unknown` never
    /// comes out of here.
    pub fn classify(upper: Level, lower: Level) -> TapeZone {
        match (upper.is_high(), lower.is_high()) {
            (false, false) => TapeZone::Bot,
            (true, false) => TapeZone::Eot,
            (false, true) => TapeZone::EarlyWarning,
            (true, true) => TapeZone::Data,
        }
    }

    /// Sensor levels that produce `self`. `None` for `Unknown`.
    pub fn levels(self) -> Option<(Level, Level)> {
        let level = |high: bool| if high { Level::High } else { Level::Low };
        match self {
            TapeZone::Unknown => None,
            TapeZone::Bot => Some((level(false), level(false))),
            TapeZone::Eot => Some((level(true), level(false))),
            TapeZone::EarlyWarning => Some((level(false), level(true))),
            TapeZone::Data => Some((level(true), level(true))),
        }
    }
}

/// State shared between the pin-change interrupt and the main loop.
///
/// The zone cell has a single writer, [`ZoneTracker`], which stores with `Release`. Readers load
/// with `Acquire` and must cope with a value that is one interrupt latency old. Nothing resets
/// the cell between operations.
#[derive(Debug, Default)]
pub struct RunState {
    zone: AtomicU8,
}

impl RunState {
    pub const fn new() -> Self {
        Self {
            zone: AtomicU8::new(TapeZone::Unknown as u8),
        }
    }

    pub fn zone(&self) -> TapeZone {
        TapeZone::from_repr(self.zone.load(Ordering::Acquire)).unwrap_or_default()
    }

    fn publish(&self, zone: TapeZone) {
        self.zone.store(zone as u8, Ordering::Release);
    }
}

/// Pin-change interrupt handler.
pub struct ZoneTracker<'a, S> {
    state: &'a RunState,
    lines: S,
}

impl<'a, S: SenseLines> ZoneTracker<'a, S> {
    pub fn new(state: &'a RunState, lines: S) -> Self {
        Self { state, lines }
    }

    /// Acknowledge first: an edge arriving while the lines are read raises a fresh event
    /// instead of being lost. No debouncing, the last edge wins.
    pub fn on_pin_change(&mut self) {
        self.lines.clear_pending();

        let zone = TapeZone::classify(self.lines.upper(), self.lines.lower());
        self.state.publish(zone);
    }

    pub fn lines(&self) -> &S {
        &self.lines
    }

    pub fn lines_mut(&mut self) -> &mut S {
        &mut self.lines
    }
}
