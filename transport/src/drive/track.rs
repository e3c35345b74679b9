use super::Drive;
use crate::hal::{Hal, Output};

/// Tracks are numbered 0..=8. Track 0 is the bulk-erase pass of a write test.
pub const MAX_TRACK: u8 = 8;

impl<H: Hal> Drive<H> {
    /// Put `track` on the four track lines, one bit per line. Range checking is up to the
    /// caller; the drive only samples the lines at BOT/EOT before the motor starts.
    pub fn select_track(&mut self, track: u8) {
        for (bit, line) in Output::TRACK.into_iter().enumerate() {
            self.hal.set(line, track & (1 << bit) != 0);
        }
    }

    /// Flip the lowest track bit and return its new value.
    pub fn toggle_track0(&mut self) -> bool {
        let bit = !self.hal.is_set(Output::Track0);
        self.hal.set(Output::Track0, bit);
        bit
    }
}
