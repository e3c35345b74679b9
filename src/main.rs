mod bench;
mod prompt;
mod serial;
mod store;

use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::thread;

use anyhow::Result;
use clap::Parser;
use transport::sim::TapeModel;
use transport::{Controller, Drive, RunState};

use crate::bench::{BenchHal, Interrupts, SharedModel, POSITION_ENV};
use crate::prompt::Prompt;
use crate::serial::SerialConsole;
use crate::store::ConfigStore;

/// Tape transport test fixture, driving a simulated drive.
///
/// While an operation runs, a line `x` aborts and restarts the fixture, and a line `t` flips the
/// lowest track bit.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Configuration blob
    #[arg(long, default_value = "fixture.cfg")]
    store: PathBuf,
    /// Enter the configuration prompt without waiting for a key
    #[arg(long)]
    prompt: bool,
    /// Length of the simulated tape, in milliseconds of motion
    #[arg(long, default_value_t = 4000, value_parser = clap::value_parser!(u32).range(64..))]
    length: u32,
    /// Initial tape position
    #[arg(long, default_value_t = 0)]
    position: u32,
    /// Run without a cartridge in the drive
    #[arg(long)]
    no_cartridge: bool,
    /// The drive never answers a select
    #[arg(long)]
    unresponsive: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let store = ConfigStore::new(&args.store);
    let mut config = store.load()?;

    // A restart keeps the tape where it was.
    let position = std::env::var(POSITION_ENV)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(args.position);
    let mut model = TapeModel::new(args.length).at(position);
    model.cartridge = !args.no_cartridge;
    model.responsive = !args.unresponsive;
    let model = SharedModel::new(model);

    let mut console = SerialConsole::open();
    let state = RunState::new();
    let interrupts = Interrupts::default();

    thread::scope(|s| -> Result<()> {
        bench::spawn_ticker(s, model.clone(), &state, &interrupts);

        let mut drive = Drive::new(BenchHal::new(model.clone()));
        if args.prompt || prompt::requested(&config, &mut console) {
            let start = Prompt::new(&mut drive, &store, &mut config).serve(&mut console);
            if !matches!(start, Ok(true)) {
                interrupts.shutdown.store(true, Ordering::Release);
                return start.map(|_| ());
            }
        }

        interrupts.enabled.store(true, Ordering::Release);
        Controller::new(drive.into_hal(), console, &state, config).run()
    })
}
