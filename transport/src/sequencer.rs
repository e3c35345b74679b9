use strum::Display;

use crate::config::{Operation, RunConfig};
use crate::drive::{Drive, MAX_TRACK, RESET_SETTLE_MS};
use crate::err::DriveError;
use crate::hal::{Console, Event, Hal, Key};
use crate::zone::{RunState, TapeZone};

/// Period of the idle loop.
pub const IDLE_TICK_MS: u32 = 1000;

/// Why the fixture restarts. A restart is always the last thing an operation does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum RestartReason {
    #[strum(to_string = "Rewind complete")]
    RewindComplete,
    #[strum(to_string = "End of write")]
    EndOfWrite,
    #[strum(to_string = "Abort key received")]
    OperatorAbort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleReason {
    NoOperation,
    Failed(DriveError),
}

/// How an operation ended.
#[must_use]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halt {
    /// The fixture must restart now.
    Restart(RestartReason),
    /// Nothing more happens until the operator steps in. Outputs stay as they are.
    Idle(IdleReason),
}

impl From<DriveError> for Halt {
    fn from(err: DriveError) -> Self {
        Halt::Idle(IdleReason::Failed(err))
    }
}

/// Walks the transport through rewind, exercise and write-test runs.
pub struct Sequencer<'a, H, C> {
    drive: Drive<H>,
    console: C,
    state: &'a RunState,
    config: RunConfig,
    track: u8,
}

impl<'a, H: Hal, C: Console> Sequencer<'a, H, C> {
    pub fn new(drive: Drive<H>, console: C, state: &'a RunState, config: RunConfig) -> Self {
        Self {
            drive,
            console,
            state,
            config,
            track: 0,
        }
    }

    pub fn track(&self) -> u8 {
        self.track
    }

    pub fn drive(&self) -> &Drive<H> {
        &self.drive
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    fn report(&mut self, event: Event) {
        log::debug!("{event}");
        self.console.report(&event);
    }

    /// Serve one operator key. Only an abort asks for a restart.
    fn check_keys(&mut self) -> Option<RestartReason> {
        match self.console.poll_key()? {
            Key::Abort => Some(RestartReason::OperatorAbort),
            Key::ToggleTrack0 => {
                let bit = self.drive.toggle_track0();
                self.report(Event::TrackBit(bit));
                None
            }
        }
    }

    fn reset_and_select(&mut self) -> Result<(), Halt> {
        self.report(Event::ResettingDrive);
        self.drive.reset();
        self.drive.hal_mut().delay_ms(RESET_SETTLE_MS);

        self.report(Event::SelectingDrive);
        self.drive.select(true)?;
        Ok(())
    }

    /// Half a lap: run the motor until the tracker reports `target`, then stop.
    ///
    /// With `gating` the write gate follows every zone sample, including the one at the
    /// boundary, so the heads are off once the half-lap ends.
    pub fn run_to_zone(&mut self, target: TapeZone, reverse: bool, gating: bool) -> Result<(), Halt> {
        self.drive.go(true, reverse)?;

        let mut zone = self.state.zone();
        while zone != target {
            if gating {
                self.drive.write_gate(zone, self.track);
            }
            if let Some(reason) = self.check_keys() {
                return Err(Halt::Restart(reason));
            }
            zone = self.state.zone();
        }
        if gating {
            self.drive.write_gate(zone, self.track);
        }

        self.drive.go(false, false)?;
        self.report(Event::Done);
        Ok(())
    }

    fn finish(&mut self, result: Result<RestartReason, Halt>) -> Halt {
        let halt = match result {
            Ok(reason) => Halt::Restart(reason),
            Err(halt) => halt,
        };
        if let Halt::Idle(IdleReason::Failed(err)) = halt {
            log::error!("operation abandoned at track {}: {err}", self.track);
            self.report(Event::Failed(err));
        }
        halt
    }

    /// Rewind to BOT. The track lines are left alone.
    pub fn rewind(&mut self) -> Halt {
        self.report(Event::OperationStarted(Operation::Rewind));

        let result = self.try_rewind();
        self.finish(result)
    }

    fn try_rewind(&mut self) -> Result<RestartReason, Halt> {
        self.reset_and_select()?;

        self.report(Event::Rewinding);
        self.run_to_zone(TapeZone::Bot, true, false)?;
        Ok(RestartReason::RewindComplete)
    }

    /// Lap the tape over tracks 0 to 8, forever for an exercise, and up to the stop track for
    /// a write test.
    pub fn exercise(&mut self) -> Halt {
        self.report(Event::OperationStarted(self.config.operation));

        let result = self.try_exercise();
        self.finish(result)
    }

    fn try_exercise(&mut self) -> Result<RestartReason, Halt> {
        let write_test = self.config.operation == Operation::WriteTest;
        let stop_track = self.config.stop_track();

        loop {
            // Every lap starts from a fresh reset, in case the drive dropped select.
            self.track = 0;
            self.reset_and_select()?;

            loop {
                let to_bot = if self.track == 0 {
                    Event::Rewinding
                } else {
                    Event::RunningToBot
                };
                self.report(to_bot);
                self.run_to_zone(TapeZone::Bot, true, false)?;

                self.drive.select_track(self.track);
                self.report(Event::RunningToEot);
                self.run_to_zone(TapeZone::Eot, false, write_test)?;

                if write_test && self.track >= stop_track {
                    self.report(Event::EndOfWrite);
                    return Ok(RestartReason::EndOfWrite);
                }
                if self.track == MAX_TRACK {
                    self.report(Event::EndOfExercise);
                    break;
                }

                self.track += 1;
                self.report(Event::MovingToTrack(self.track));
                self.drive.select_track(self.track);
            }
        }
    }

    /// Run the configured operation.
    pub fn run(&mut self) -> Halt {
        match self.config.operation {
            Operation::Exercise | Operation::WriteTest => self.exercise(),
            Operation::Rewind => self.rewind(),
            Operation::None => {
                self.report(Event::NoOperation);
                Halt::Idle(IdleReason::NoOperation)
            }
        }
    }
}

/// Top-level owner of the engine: runs the configured operation and then either restarts or
/// idles until the operator aborts.
pub struct Controller<'a, H, C> {
    sequencer: Sequencer<'a, H, C>,
}

impl<'a, H: Hal, C: Console> Controller<'a, H, C> {
    pub fn new(hal: H, console: C, state: &'a RunState, config: RunConfig) -> Self {
        Self {
            sequencer: Sequencer::new(Drive::new(hal), console, state, config),
        }
    }

    pub fn sequencer(&self) -> &Sequencer<'a, H, C> {
        &self.sequencer
    }

    pub fn run(mut self) -> ! {
        match self.sequencer.run() {
            Halt::Restart(reason) => self.restart(reason),
            Halt::Idle(reason) => {
                log::info!("idle: {reason:?}");
                loop {
                    if let Some(reason) = self.idle_tick() {
                        self.restart(reason);
                    }
                }
            }
        }
    }

    /// One pass of the idle loop: serve a key, then sleep a tick.
    pub fn idle_tick(&mut self) -> Option<RestartReason> {
        if let Some(reason) = self.sequencer.check_keys() {
            return Some(reason);
        }
        self.sequencer.drive.hal_mut().delay_ms(IDLE_TICK_MS);
        None
    }

    fn restart(&mut self, reason: RestartReason) -> ! {
        self.sequencer.report(Event::Restarting(reason));
        self.sequencer.drive.hal_mut().restart(reason)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hal::Output;
    use crate::sim::bench::{bench, Bench, BenchConsole, BenchHal, Shared};
    use crate::sim::TapeModel;

    const LENGTH: u32 = 200;

    /// Somewhere in the data region, so the first half-lap crosses into BOT.
    fn mid_tape() -> TapeModel {
        TapeModel::new(LENGTH).at(100)
    }

    fn sequencer<'a>(
        model: TapeModel,
        state: &'a RunState,
        config: RunConfig,
    ) -> (Shared, Sequencer<'a, BenchHal<'a>, BenchConsole<'a>>) {
        let (shared, hal, console) = bench(model, state);
        (shared, Sequencer::new(Drive::new(hal), console, state, config))
    }

    fn tracks_written(bench: &Bench) -> Vec<u8> {
        let mut track = 0;
        let mut tracks = Vec::new();
        for event in &bench.events {
            match event {
                Event::Rewinding => track = 0,
                Event::MovingToTrack(next) => track = *next,
                Event::RunningToEot => tracks.push(track),
                _ => {}
            }
        }
        tracks
    }

    #[test]
    fn test_rewind_stops_at_bot() {
        let state = RunState::new();
        let model = TapeModel::new(LENGTH).at(150);
        let (shared, mut seq) = sequencer(model, &state, RunConfig::new(Operation::Rewind, 1));

        assert_eq!(seq.run(), Halt::Restart(RestartReason::RewindComplete));
        assert_eq!(state.zone(), TapeZone::Bot);

        let bench = shared.borrow();
        assert_eq!(
            bench.events,
            vec![
                Event::OperationStarted(Operation::Rewind),
                Event::ResettingDrive,
                Event::SelectingDrive,
                Event::Rewinding,
                Event::Done,
            ]
        );
        assert!(!bench.model.output(Output::Go));
        assert!(bench.writes.iter().all(|(line, _)| !Output::TRACK.contains(line)));
        assert!(bench.writes.iter().all(|(line, _)| *line != Output::WriteEnable));
    }

    #[test]
    fn test_rewind_needs_a_bot_edge() {
        // Parked at BOT after boot: no edge ever reaches the tracker, so only the operator can
        // end the run.
        let state = RunState::new();
        let (shared, mut seq) = sequencer(TapeModel::new(LENGTH), &state, RunConfig::new(Operation::Rewind, 1));
        shared.borrow_mut().abort_on(Event::Rewinding, 1);

        assert_eq!(seq.run(), Halt::Restart(RestartReason::OperatorAbort));
        assert_eq!(state.zone(), TapeZone::Unknown);
        // no graceful unwind
        assert!(shared.borrow().model.output(Output::Go));
    }

    #[test]
    fn test_write_test_stops_at_track() {
        let state = RunState::new();
        let (shared, mut seq) = sequencer(mid_tape(), &state, RunConfig::new(Operation::WriteTest, 3));

        assert_eq!(seq.run(), Halt::Restart(RestartReason::EndOfWrite));
        assert_eq!(seq.track(), 3);

        let bench = shared.borrow();
        assert_eq!(tracks_written(&bench), vec![0, 1, 2, 3]);
        assert_eq!(bench.events.last(), Some(&Event::EndOfWrite));
        assert_eq!(bench.count(Event::ResettingDrive), 1);
        assert_eq!(bench.model.track(), 3);
        assert_eq!(bench.model.zone(), TapeZone::Eot);

        // Both heads were used, and both are off at the end.
        assert!(bench.writes.contains(&(Output::EraseEnable, true)));
        assert!(bench.writes.contains(&(Output::WriteEnable, true)));
        assert!(!bench.model.output(Output::WriteEnable));
        assert!(!bench.model.output(Output::EraseEnable));
    }

    #[test]
    fn test_write_test_erases_on_track_zero_only() {
        let state = RunState::new();
        let (shared, mut seq) = sequencer(mid_tape(), &state, RunConfig::new(Operation::WriteTest, 1));
        // Note how many writes were made when track 1 started.
        shared.borrow_mut().on(Event::MovingToTrack(1), 1, |bench| {
            let count = bench.writes.len();
            bench.marks.push(count);
        });

        assert_eq!(seq.run(), Halt::Restart(RestartReason::EndOfWrite));

        let bench = shared.borrow();
        let (lap0, lap1) = bench.writes.split_at(bench.marks[0]);
        assert!(lap0.contains(&(Output::EraseEnable, true)));
        assert!(!lap1.contains(&(Output::EraseEnable, true)));
        assert!(lap1.contains(&(Output::WriteEnable, true)));
    }

    #[test]
    fn test_write_test_stop_at_zero() {
        let state = RunState::new();
        let (shared, mut seq) = sequencer(mid_tape(), &state, RunConfig::new(Operation::WriteTest, 0));

        assert_eq!(seq.run(), Halt::Restart(RestartReason::EndOfWrite));

        let bench = shared.borrow();
        assert_eq!(tracks_written(&bench), vec![0]);
        assert!(bench.events.iter().all(|e| !matches!(e, Event::MovingToTrack(_))));
    }

    #[test]
    fn test_write_test_stop_clamped() {
        let state = RunState::new();
        let (shared, mut seq) = sequencer(mid_tape(), &state, RunConfig::new(Operation::WriteTest, 200));

        assert_eq!(seq.run(), Halt::Restart(RestartReason::EndOfWrite));
        assert_eq!(seq.track(), MAX_TRACK);

        let bench = shared.borrow();
        assert_eq!(tracks_written(&bench), (0..=MAX_TRACK).collect::<Vec<_>>());
        assert_eq!(bench.count(Event::EndOfExercise), 0);
    }

    #[test]
    fn test_exercise_wraps_with_fresh_reset() {
        let state = RunState::new();
        let (shared, mut seq) = sequencer(mid_tape(), &state, RunConfig::new(Operation::Exercise, 0));
        // Two half-laps into the second lap.
        shared.borrow_mut().abort_on(Event::RunningToEot, 11);

        assert_eq!(seq.run(), Halt::Restart(RestartReason::OperatorAbort));

        let bench = shared.borrow();
        assert_eq!(tracks_written(&bench), vec![0, 1, 2, 3, 4, 5, 6, 7, 8, 0, 1]);
        assert_eq!(bench.count(Event::EndOfExercise), 1);
        assert_eq!(bench.count(Event::ResettingDrive), 2);
        assert_eq!(bench.count(Event::Rewinding), 2);
        assert_eq!(bench.count(Event::RunningToBot), 9);
        // An exercise never touches the write gate.
        assert!(bench.writes.iter().all(|(line, _)| *line != Output::WriteEnable));
    }

    #[test]
    fn test_toggle_key_during_run() {
        let state = RunState::new();
        let (shared, mut seq) = sequencer(mid_tape(), &state, RunConfig::new(Operation::WriteTest, 0));
        shared.borrow_mut().on(Event::RunningToEot, 1, |bench| bench.keys.push_back(Key::ToggleTrack0));

        assert_eq!(seq.run(), Halt::Restart(RestartReason::EndOfWrite));

        let bench = shared.borrow();
        assert_eq!(bench.count(Event::TrackBit(true)), 1);
        assert_eq!(bench.model.track(), 1);
    }

    #[test]
    fn test_select_failure_idles() {
        let state = RunState::new();
        let mut model = TapeModel::new(LENGTH);
        model.cartridge = false;
        let (shared, mut seq) = sequencer(model, &state, RunConfig::new(Operation::Exercise, 0));

        let halt = seq.run();
        assert_eq!(halt, Halt::Idle(IdleReason::Failed(DriveError::CartridgeAbsent)));
        assert_eq!(
            shared.borrow().events.last(),
            Some(&Event::Failed(DriveError::CartridgeAbsent))
        );
    }

    #[test]
    fn test_cartridge_pulled_mid_run() {
        let state = RunState::new();
        let (shared, mut seq) = sequencer(mid_tape(), &state, RunConfig::new(Operation::WriteTest, 8));
        shared.borrow_mut().on(Event::MovingToTrack(2), 1, |bench| bench.model.cartridge = false);

        let halt = seq.run();
        assert_eq!(halt, Halt::Idle(IdleReason::Failed(DriveError::NotSelected)));
        assert_eq!(seq.track(), 2);

        let bench = shared.borrow();
        assert_eq!(tracks_written(&bench), vec![0, 1]);
        assert_eq!(bench.count(Event::ResettingDrive), 1);
    }

    #[test]
    fn test_no_operation() {
        let state = RunState::new();
        let (shared, mut seq) = sequencer(TapeModel::new(LENGTH), &state, RunConfig::default());

        assert_eq!(seq.run(), Halt::Idle(IdleReason::NoOperation));
        assert_eq!(shared.borrow().events, vec![Event::NoOperation]);
        assert!(shared.borrow().writes.is_empty());
    }

    fn run_controller(controller: Controller<'_, BenchHal<'_>, BenchConsole<'_>>) -> RestartReason {
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| controller.run()));
        let payload = result.err().unwrap();
        *payload.downcast::<RestartReason>().unwrap()
    }

    #[test]
    fn test_controller_restarts_after_rewind() {
        let state = RunState::new();
        let (shared, hal, console) = bench(TapeModel::new(LENGTH).at(120), &state);
        let controller = Controller::new(hal, console, &state, RunConfig::new(Operation::Rewind, 0));

        assert_eq!(run_controller(controller), RestartReason::RewindComplete);
        assert_eq!(
            shared.borrow().events.last(),
            Some(&Event::Restarting(RestartReason::RewindComplete))
        );
    }

    #[test]
    fn test_controller_idles_after_failure() {
        let state = RunState::new();
        let mut model = TapeModel::new(LENGTH);
        model.responsive = false;
        let (shared, hal, console) = bench(model, &state);
        let mut controller = Controller::new(hal, console, &state, RunConfig::new(Operation::Rewind, 0));

        let halt = controller.sequencer.run();
        assert_eq!(halt, Halt::Idle(IdleReason::Failed(DriveError::DriveNotResponding)));

        let writes = shared.borrow().writes.len();
        let clock = shared.borrow().model.clock_ms();
        for _ in 0..3 {
            assert_eq!(controller.idle_tick(), None);
        }
        // one poll plus one idle period per tick
        assert_eq!(shared.borrow().model.clock_ms(), clock + 3 * (IDLE_TICK_MS as u64 + 1));
        assert_eq!(shared.borrow().writes.len(), writes);

        shared.borrow_mut().keys.push_back(Key::Abort);
        assert_eq!(controller.idle_tick(), Some(RestartReason::OperatorAbort));
    }

    #[test]
    fn test_controller_restarts_on_abort_while_idle() {
        let state = RunState::new();
        let mut model = TapeModel::new(LENGTH);
        model.cartridge = false;
        let (shared, hal, console) = bench(model, &state);
        shared
            .borrow_mut()
            .on(Event::Failed(DriveError::CartridgeAbsent), 1, |bench| {
                let count = bench.writes.len();
                bench.marks.push(count);
                bench.keys.push_back(Key::Abort);
            });
        let controller = Controller::new(hal, console, &state, RunConfig::new(Operation::WriteTest, 3));

        assert_eq!(run_controller(controller), RestartReason::OperatorAbort);

        let bench = shared.borrow();
        // Nothing touches the outputs between the failure and the restart.
        assert_eq!(bench.writes.len(), bench.marks[0]);
        assert_eq!(
            bench.events.last(),
            Some(&Event::Restarting(RestartReason::OperatorAbort))
        );
    }
}
