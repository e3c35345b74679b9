//! A software stand-in for the tape transport.
//!
//! The tape moves one unit per millisecond while the motor runs. Position 0 is the physical
//! start of the tape; the sensor holes mark the BOT region, the early-warning region and the
//! EOT region at the far end.

use std::collections::HashSet;

use crate::hal::{Input, Level, Output};
use crate::zone::TapeZone;

/// Length of the BOT and EOT hole regions, in tape units.
pub const MARKER_LEN: u32 = 10;
/// Length of the early-warning region in front of EOT.
pub const WARNING_LEN: u32 = 20;

#[derive(Debug, Clone)]
pub struct TapeModel {
    position: u32,
    length: u32,
    asserted: HashSet<Output>,
    clock_ms: u64,
    selected_at: Option<u64>,

    /// A cartridge sits in the drive.
    pub cartridge: bool,
    /// The drive answers a select request.
    pub responsive: bool,
    /// Time from select until the drive reports loaded.
    pub load_latency_ms: u64,
}

impl TapeModel {
    pub fn new(length: u32) -> Self {
        assert!(length > 2 * MARKER_LEN + WARNING_LEN);

        Self {
            position: 0,
            length,
            asserted: HashSet::new(),
            clock_ms: 0,
            selected_at: None,
            cartridge: true,
            responsive: true,
            load_latency_ms: 20,
        }
    }

    pub fn at(mut self, position: u32) -> Self {
        self.position = position.min(self.length);
        self
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn clock_ms(&self) -> u64 {
        self.clock_ms
    }

    pub fn zone(&self) -> TapeZone {
        let eot_start = self.length - MARKER_LEN;
        let warning_start = eot_start - WARNING_LEN;

        if self.position < MARKER_LEN {
            TapeZone::Bot
        } else if self.position >= eot_start {
            TapeZone::Eot
        } else if self.position >= warning_start {
            TapeZone::EarlyWarning
        } else {
            TapeZone::Data
        }
    }

    fn loaded(&self) -> bool {
        let settled = self
            .selected_at
            .map(|since| self.clock_ms - since >= self.load_latency_ms)
            .unwrap_or(false);
        self.cartridge && self.responsive && settled
    }

    pub fn sense(&self, input: Input) -> Level {
        let asserted = match input {
            Input::UpperSense | Input::LowerSense => {
                let (upper, lower) = self.zone().levels().unwrap_or((Level::High, Level::High));
                return if input == Input::UpperSense { upper } else { lower };
            }
            Input::Loaded => self.loaded(),
            Input::CartridgeIn => self.cartridge,
        };
        if asserted {
            Level::Low
        } else {
            Level::High
        }
    }

    pub fn drive(&mut self, output: Output, asserted: bool) {
        if output == Output::Select {
            match (asserted, self.selected_at) {
                (true, None) => self.selected_at = Some(self.clock_ms),
                (false, _) => self.selected_at = None,
                _ => {}
            }
        }

        if asserted {
            self.asserted.insert(output);
        } else {
            self.asserted.remove(&output);
        }
    }

    pub fn output(&self, output: Output) -> bool {
        self.asserted.contains(&output)
    }

    pub fn track(&self) -> u8 {
        Output::TRACK
            .iter()
            .enumerate()
            .filter(|(_, line)| self.output(**line))
            .fold(0, |track, (bit, _)| track | 1 << bit)
    }

    /// Motion stops while the drive is held in reset or has dropped the cartridge.
    fn running(&self) -> bool {
        self.output(Output::Go) && !self.output(Output::Reset) && self.loaded()
    }

    /// Advance one millisecond. Returns `true` when the sensor levels changed, which is what
    /// raises the pin-change interrupt on the real fixture.
    pub fn tick(&mut self) -> bool {
        let before = self.zone();

        self.clock_ms += 1;
        if self.running() {
            if self.output(Output::Reverse) {
                self.position = self.position.saturating_sub(1);
            } else {
                self.position = (self.position + 1).min(self.length);
            }
        }
        self.zone() != before
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_zones_along_tape() {
        let model = TapeModel::new(100);
        assert_eq!(model.zone(), TapeZone::Bot);
        assert_eq!(model.clone().at(50).zone(), TapeZone::Data);
        assert_eq!(model.clone().at(75).zone(), TapeZone::EarlyWarning);
        assert_eq!(model.clone().at(95).zone(), TapeZone::Eot);
    }

    #[test]
    fn test_loaded_after_latency() {
        let mut model = TapeModel::new(100);
        model.drive(Output::Select, true);
        assert_eq!(model.sense(Input::Loaded), Level::High);

        for _ in 0..model.load_latency_ms {
            model.tick();
        }
        assert_eq!(model.sense(Input::Loaded), Level::Low);

        model.drive(Output::Select, false);
        assert_eq!(model.sense(Input::Loaded), Level::High);
    }

    #[test]
    fn test_motion_reports_edges() {
        let mut model = TapeModel::new(100).at(MARKER_LEN - 1);
        model.load_latency_ms = 0;
        model.drive(Output::Select, true);
        model.drive(Output::Go, true);

        assert!(model.tick());
        assert_eq!(model.zone(), TapeZone::Data);
        assert!(!model.tick());

        model.drive(Output::Reverse, true);
        model.tick();
        assert!(model.tick());
        assert_eq!(model.zone(), TapeZone::Bot);
    }

    #[test]
    fn test_track_lines() {
        let mut model = TapeModel::new(100);
        model.drive(Output::Track0, true);
        model.drive(Output::Track3, true);
        assert_eq!(model.track(), 9);
    }
}
