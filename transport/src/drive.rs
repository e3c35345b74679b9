mod handshake;
mod pattern;
mod track;

use crate::hal::{Hal, Input, Output};
use crate::zone::TapeZone;

pub use handshake::{RESET_PULSE_MS, RESET_SETTLE_MS, SELECT_POLL_LIMIT, SELECT_SETTLE_MS};
pub use track::MAX_TRACK;

/// The drive interface: select handshake, motor, head position and write gate.
pub struct Drive<H> {
    hal: H,
}

/// Snapshot of every line of the interface, for the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveState {
    pub zone: TapeZone,
    pub loaded: bool,
    pub cartridge: bool,
    pub outputs: Vec<(Output, bool)>,
}

impl<H: Hal> Drive<H> {
    pub fn new(hal: H) -> Self {
        Self { hal }
    }

    pub fn hal(&self) -> &H {
        &self.hal
    }

    pub fn hal_mut(&mut self) -> &mut H {
        &mut self.hal
    }

    pub fn into_hal(self) -> H {
        self.hal
    }

    /// Zone from the live sensor levels, independent of what the tracker last published.
    pub fn sense_zone(&self) -> TapeZone {
        TapeZone::classify(self.hal.read(Input::UpperSense), self.hal.read(Input::LowerSense))
    }

    pub fn state(&self) -> DriveState {
        use strum::IntoEnumIterator;

        DriveState {
            zone: self.sense_zone(),
            loaded: self.hal.read(Input::Loaded).asserted(),
            cartridge: self.hal.read(Input::CartridgeIn).asserted(),
            outputs: Output::iter().map(|line| (line, self.hal.is_set(line))).collect(),
        }
    }
}
