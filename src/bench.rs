//! The fixture hardware, simulated: a tape model stepped in real time by a ticker thread that
//! also plays the pin-change interrupt.

use std::env;
use std::io::{self, Write};
use std::os::unix::process::CommandExt;
use std::process::Command;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, Scope};
use std::time::Duration;

use transport::sim::TapeModel;
use transport::{Hal, Input, Level, Output, RestartReason, RunState, SenseLines, ZoneTracker};

/// Tape position handed over to the restarted process.
pub const POSITION_ENV: &str = "TAPE_FIXTURE_POSITION";

#[derive(Clone)]
pub struct SharedModel(Arc<Mutex<TapeModel>>);

impl SharedModel {
    pub fn new(model: TapeModel) -> Self {
        Self(Arc::new(Mutex::new(model)))
    }

    pub fn lock(&self) -> MutexGuard<'_, TapeModel> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Interrupt-side view of the sensors. `pending` is the latched pin-change flag.
pub struct BenchLines {
    model: SharedModel,
    pending: bool,
}

impl SenseLines for BenchLines {
    fn clear_pending(&mut self) {
        self.pending = false;
    }

    fn upper(&self) -> Level {
        self.model.lock().sense(Input::UpperSense)
    }

    fn lower(&self) -> Level {
        self.model.lock().sense(Input::LowerSense)
    }
}

/// Interrupt control shared between main and the ticker.
#[derive(Default)]
pub struct Interrupts {
    /// Pin-change events are delivered. Edges seen before this stay latched.
    pub enabled: AtomicBool,
    pub shutdown: AtomicBool,
}

/// Move the tape one unit per millisecond until shutdown.
pub fn spawn_ticker<'scope, 'env>(
    scope: &'scope Scope<'scope, 'env>,
    model: SharedModel,
    state: &'env RunState,
    interrupts: &'env Interrupts,
) {
    scope.spawn(move || {
        let lines = BenchLines {
            model: model.clone(),
            pending: false,
        };
        let mut tracker = ZoneTracker::new(state, lines);

        while !interrupts.shutdown.load(Ordering::Acquire) {
            thread::sleep(Duration::from_millis(1));

            let edge = model.lock().tick();
            if edge {
                tracker.lines_mut().pending = true;
            }
            if tracker.lines().pending && interrupts.enabled.load(Ordering::Acquire) {
                tracker.on_pin_change();
                log::trace!("zone {}", state.zone());
            }
        }
    });
}

pub struct BenchHal {
    model: SharedModel,
}

impl BenchHal {
    pub fn new(model: SharedModel) -> Self {
        Self { model }
    }
}

impl Hal for BenchHal {
    fn read(&self, input: Input) -> Level {
        self.model.lock().sense(input)
    }

    fn set(&mut self, output: Output, asserted: bool) {
        self.model.lock().drive(output, asserted);
    }

    fn is_set(&self, output: Output) -> bool {
        self.model.lock().output(output)
    }

    fn delay_ms(&mut self, ms: u32) {
        thread::sleep(Duration::from_millis(ms as u64));
    }

    /// Start the program over, keeping the tape where it is.
    fn restart(&mut self, reason: RestartReason) -> ! {
        let position = self.model.lock().position();
        log::info!("restart ({reason}) at tape position {position}");
        let _ = io::stdout().flush();

        let err = match env::current_exe() {
            Ok(exe) => Command::new(exe)
                .args(env::args_os().skip(1))
                .env(POSITION_ENV, position.to_string())
                .exec(),
            Err(e) => e,
        };
        log::error!("unable to restart: {err}");
        std::process::exit(1)
    }
}
