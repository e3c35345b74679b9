//! Configuration prompt, entered at boot.

use std::io::{self, Write};
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use transport::{Drive, Hal, Operation, RunConfig, MAX_TRACK};

use crate::serial::SerialConsole;
use crate::store::ConfigStore;

/// How long the operator has to ask for the prompt when an operation is configured.
pub const PROMPT_WINDOW: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[command(multicall = true)]
struct PromptLine {
    #[command(subcommand)]
    command: PromptCommand,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum PromptCommand {
    /// Operation run after boot. For 'writetest' ensure the 150.15 kHz test signal is connected
    Operation { operation: Operation },
    /// Index of the last track to record when writing a test tape (0-8)
    Stopat { track: u8 },
    /// Select (1) or deselect (0) the drive
    #[command(name = "driveselect", alias = "s")]
    DriveSelect {
        #[arg(value_parser = clap::value_parser!(u8).range(0..=1))]
        selected: u8,
    },
    /// Pulse the drive reset line
    #[command(name = "drivereset", alias = "r")]
    DriveReset,
    /// Start or stop the motor
    #[command(name = "drivego", alias = "g")]
    DriveGo { motion: Motion },
    /// Put a track on the head lines. Only observed at EOT/BOT before motor start
    #[command(name = "drivetrack", alias = "k")]
    DriveTrack {
        #[arg(value_parser = clap::value_parser!(u8).range(0..=MAX_TRACK as i64))]
        track: u8,
    },
    /// Show the interface lines
    #[command(name = "drivestate", alias = "t")]
    DriveState,
    /// Store the configuration
    Save,
    /// Load the default configuration
    Default,
    /// Show the configuration
    Show,
    /// Leave the prompt and start the operation
    Run { operation: Option<Operation> },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq)]
pub enum Motion {
    #[value(alias = "f")]
    Fwd,
    #[value(alias = "r")]
    Rev,
    #[value(alias = "s")]
    Stop,
}

#[derive(Debug)]
pub enum Flow {
    Continue,
    Run,
}

pub fn parse(line: &str) -> Result<PromptCommand, clap::Error> {
    PromptLine::try_parse_from(line.split_whitespace()).map(|line| line.command)
}

/// The prompt is always entered without an operation. Otherwise the operator has
/// [`PROMPT_WINDOW`] to send a line.
pub fn requested(config: &RunConfig, console: &mut SerialConsole) -> bool {
    if config.operation == Operation::None {
        return true;
    }

    println!("<Press Enter to enter configuration prompt>");
    console.wait_line(PROMPT_WINDOW).is_some()
}

pub struct Prompt<'a, H> {
    drive: &'a mut Drive<H>,
    store: &'a ConfigStore,
    config: &'a mut RunConfig,
}

impl<'a, H: Hal> Prompt<'a, H> {
    pub fn new(drive: &'a mut Drive<H>, store: &'a ConfigStore, config: &'a mut RunConfig) -> Self {
        Self { drive, store, config }
    }

    /// Serve commands until `run`. Returns `false` when the console went away instead.
    pub fn serve(&mut self, console: &mut SerialConsole) -> Result<bool> {
        println!();
        loop {
            print!("config>");
            io::stdout().flush()?;

            let Some(line) = console.read_line() else {
                println!();
                return Ok(false);
            };
            if line.trim().is_empty() {
                continue;
            }

            let command = match parse(&line) {
                Ok(command) => command,
                Err(e) => {
                    let _ = e.print();
                    continue;
                }
            };
            match self.execute(command) {
                Ok(Flow::Continue) => {}
                Ok(Flow::Run) => return Ok(true),
                Err(e) => {
                    println!("Error: {e}");
                    println!("Error: command failed");
                }
            }
        }
    }

    pub fn execute(&mut self, command: PromptCommand) -> Result<Flow> {
        match command {
            PromptCommand::Operation { operation } => self.config.operation = operation,
            PromptCommand::Stopat { track } => self.config.stop_at_track = track,
            PromptCommand::DriveSelect { selected } => self.drive.select(selected != 0)?,
            PromptCommand::DriveReset => self.drive.reset(),
            PromptCommand::DriveGo { motion } => {
                let (run, reverse) = match motion {
                    Motion::Fwd => (true, false),
                    Motion::Rev => (true, true),
                    Motion::Stop => (false, false),
                };
                self.drive.go(run, reverse)?;
            }
            PromptCommand::DriveTrack { track } => self.drive.select_track(track),
            PromptCommand::DriveState => {
                let state = self.drive.state();
                println!("TAPE_ZONE_{}", state.zone);
                println!("loaded: {}, cartridge: {}", state.loaded, state.cartridge);
                for (line, asserted) in state.outputs {
                    println!("\t{line}: {}", asserted as u8);
                }
            }
            PromptCommand::Save => {
                self.store.save(self.config)?;
                println!("\nConfiguration saved.\n");
            }
            PromptCommand::Default => {
                *self.config = RunConfig::default();
                println!("\nDefault configuration loaded.\n");
            }
            PromptCommand::Show => {
                println!("\nCurrent configuration:\n");
                println!("\toperation: {}", self.config.operation);
                println!("\tstopat:    {}", self.config.stop_at_track);
                println!();
            }
            PromptCommand::Run { operation } => {
                if let Some(operation) = operation {
                    self.config.operation = operation;
                }
                println!("\nStarting...");
                return Ok(Flow::Run);
            }
        }
        Ok(Flow::Continue)
    }
}
