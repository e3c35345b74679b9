//! Control engine for a magnetic-tape transport test fixture.
//!
//! The zone tracker runs in the pin-change interrupt and publishes the tape position into
//! [`RunState`]; the [`Sequencer`] drives the transport from the main loop through the
//! [`Drive`] handshake and polls that state.

mod config;
mod drive;
mod err;
mod hal;
mod sequencer;
pub mod sim;
mod zone;

pub use config::{Operation, RunConfig};
pub use drive::{Drive, DriveState, MAX_TRACK};
pub use err::DriveError;
pub use hal::{Console, Event, Hal, Input, Key, Level, Output, SenseLines};
pub use sequencer::{Controller, Halt, IdleReason, RestartReason, Sequencer, IDLE_TICK_MS};
pub use zone::{RunState, TapeZone, ZoneTracker};
