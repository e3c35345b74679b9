use std::fmt;

use strum::{Display, EnumIter};

use crate::config::Operation;
use crate::err::DriveError;
use crate::sequencer::RestartReason;

/// Raw level of a connector line. Every line of the drive interface is active low.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    High,
    Low,
}

impl Level {
    pub fn asserted(self) -> bool {
        self == Level::Low
    }

    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

/// Sense lines coming from the drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Input {
    /// Upper tape-hole sensor
    UpperSense,
    /// Lower tape-hole sensor
    LowerSense,
    /// Drive has the cartridge loaded and answers to select
    Loaded,
    /// Cartridge in place
    CartridgeIn,
}

/// Control lines driven by the fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Output {
    Select,
    Reset,
    Go,
    Reverse,
    Track0,
    Track1,
    Track2,
    Track3,
    /// Also gates the external test-frequency signal onto the head.
    WriteEnable,
    EraseEnable,
}

impl Output {
    pub const TRACK: [Output; 4] = [Output::Track0, Output::Track1, Output::Track2, Output::Track3];
}

/// The main-loop view of the fixture hardware.
pub trait Hal {
    fn read(&self, input: Input) -> Level;

    /// Output writes take effect immediately.
    fn set(&mut self, output: Output, asserted: bool);

    /// Read back the output latch.
    fn is_set(&self, output: Output) -> bool;

    /// Busy wait.
    fn delay_ms(&mut self, ms: u32);

    /// Reinitialize the whole fixture. Outputs return to their power-on state on the way back up.
    fn restart(&mut self, reason: RestartReason) -> !;
}

/// The interrupt-side view of the hardware: just enough to classify the tape position.
pub trait SenseLines {
    /// Acknowledge the pin-change event.
    fn clear_pending(&mut self);
    fn upper(&self) -> Level;
    fn lower(&self) -> Level;
}

/// Operator keys recognised while an operation is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// Restart the fixture from wherever it is.
    Abort,
    /// Flip the lowest track bit.
    ToggleTrack0,
}

/// Progress messages for the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    OperationStarted(Operation),
    NoOperation,
    ResettingDrive,
    SelectingDrive,
    Rewinding,
    RunningToBot,
    RunningToEot,
    Done,
    MovingToTrack(u8),
    EndOfExercise,
    EndOfWrite,
    TrackBit(bool),
    Failed(DriveError),
    Restarting(RestartReason),
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::OperationStarted(Operation::WriteTest) => write!(f, "Writing test tape..."),
            Event::OperationStarted(Operation::Rewind) => write!(f, "Rewind running..."),
            Event::OperationStarted(_) => write!(f, "Exercise running..."),
            Event::NoOperation => write!(f, "Invalid or no operation specified. Send the abort key to reset."),
            Event::ResettingDrive => write!(f, "Resetting drive"),
            Event::SelectingDrive => write!(f, "Selecting drive"),
            Event::Rewinding => write!(f, "Rewinding tape... "),
            Event::RunningToBot => write!(f, "Running tape to BOT... "),
            Event::RunningToEot => write!(f, "Running tape to EOT... "),
            Event::Done => write!(f, "Done"),
            Event::MovingToTrack(track) => write!(f, "Moving to track: {track}"),
            Event::EndOfExercise => write!(f, "End of exercise"),
            Event::EndOfWrite => write!(f, "End of write"),
            Event::TrackBit(bit) => write!(f, "{} ", *bit as u8),
            Event::Failed(err) => write!(f, "Error: {err}"),
            Event::Restarting(reason) => write!(f, "{reason}. Resetting..."),
        }
    }
}

/// The serial console as seen by the sequencer.
pub trait Console {
    /// Non-blocking.
    fn poll_key(&mut self) -> Option<Key>;

    fn report(&mut self, event: &Event);
}
