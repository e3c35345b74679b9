use super::Drive;
use crate::err::DriveError;
use crate::hal::{Hal, Input, Output};

/// Width of the reset pulse.
pub const RESET_PULSE_MS: u32 = 15;
/// How long the drive needs after a reset before it can be selected.
pub const RESET_SETTLE_MS: u32 = 200;
/// Number of 1 ms polls for the loaded line after select, about five seconds.
pub const SELECT_POLL_LIMIT: u32 = 5000;
pub const SELECT_SETTLE_MS: u32 = 1;

impl<H: Hal> Drive<H> {
    /// Pulse the reset line. Callers wait [`RESET_SETTLE_MS`] before relying on the drive.
    pub fn reset(&mut self) {
        log::debug!("drive reset");

        self.hal.set(Output::Reset, true);
        self.hal.delay_ms(RESET_PULSE_MS);
        self.hal.set(Output::Reset, false);
    }

    fn loaded(&self) -> bool {
        self.hal.read(Input::Loaded).asserted()
    }

    /// Select or deselect the drive.
    ///
    /// Deselect always succeeds. Select waits for the drive to report loaded, bounded by
    /// [`SELECT_POLL_LIMIT`] polls, then checks the cartridge. When the drive does not answer
    /// the select line stays asserted.
    pub fn select(&mut self, selected: bool) -> Result<(), DriveError> {
        if !selected {
            self.hal.set(Output::Select, false);
            return Ok(());
        }

        self.hal.set(Output::Select, true);
        let mut polls = 0;
        while polls < SELECT_POLL_LIMIT && !self.loaded() {
            self.hal.delay_ms(1);
            polls += 1;
        }
        self.hal.delay_ms(SELECT_SETTLE_MS);
        log::trace!("select: waited {polls} ms for loaded");

        if !self.hal.read(Input::CartridgeIn).asserted() {
            self.hal.set(Output::Select, false);
            log::warn!("select: no cartridge");
            return Err(DriveError::CartridgeAbsent);
        }
        if !self.loaded() {
            log::warn!("select: drive not responding after {polls} ms");
            return Err(DriveError::DriveNotResponding);
        }
        Ok(())
    }

    /// Start or stop the motor. The drive must report loaded right now, whatever the last
    /// `select` returned.
    pub fn go(&mut self, run: bool, reverse: bool) -> Result<(), DriveError> {
        if !self.loaded() {
            return Err(DriveError::NotSelected);
        }

        log::debug!("motor run={run} reverse={reverse}");
        self.hal.set(Output::Go, run);
        self.hal.set(Output::Reverse, reverse);
        Ok(())
    }
}
