use super::Drive;
use crate::hal::{Hal, Output};
use crate::zone::TapeZone;

impl<H: Hal> Drive<H> {
    /// Gate the test signal for the current zone.
    ///
    /// Inside the data region the write head is always on, and the erase head only on track 0.
    /// Outside it both are off.
    pub fn write_gate(&mut self, zone: TapeZone, track: u8) {
        let data = zone == TapeZone::Data;

        self.hal.set(Output::WriteEnable, data);
        self.hal.set(Output::EraseEnable, data && track == 0);
    }
}
