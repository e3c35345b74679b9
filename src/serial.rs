//! The serial console, standing in on stdin/stdout.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, TryRecvError};
use std::thread;
use std::time::Duration;

use transport::{Console, Event, Key};

/// Line that aborts a run. A raw EOT (Ctrl+D) character in a line works too.
pub const ABORT_LINE: &str = "x";
/// Line that flips the lowest track bit.
pub const TOGGLE_LINE: &str = "t";

pub fn parse_key(line: &str) -> Option<Key> {
    if line.contains('\u{4}') {
        return Some(Key::Abort);
    }
    match line.trim() {
        ABORT_LINE => Some(Key::Abort),
        TOGGLE_LINE => Some(Key::ToggleTrack0),
        _ => None,
    }
}

pub struct SerialConsole {
    rx: Receiver<String>,
    closed: bool,
}

impl SerialConsole {
    /// Start the reader thread on stdin.
    pub fn open() -> Self {
        let (tx, rx) = mpsc::channel();

        thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(e) => {
                        log::warn!("console read failed: {e}");
                        break;
                    }
                };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
        Self { rx, closed: false }
    }

    /// Blocks. `None` once the console is gone.
    pub fn read_line(&mut self) -> Option<String> {
        self.rx.recv().ok()
    }

    pub fn wait_line(&mut self, timeout: Duration) -> Option<String> {
        match self.rx.recv_timeout(timeout) {
            Ok(line) => Some(line),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }
}

impl Console for SerialConsole {
    fn poll_key(&mut self) -> Option<Key> {
        match self.rx.try_recv() {
            Ok(line) => parse_key(&line),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                if !self.closed {
                    log::warn!("console closed, the abort key is gone");
                    self.closed = true;
                }
                None
            }
        }
    }

    fn report(&mut self, event: &Event) {
        match event {
            // The rest of the line follows when the half-lap is done.
            Event::Rewinding | Event::RunningToBot | Event::RunningToEot | Event::TrackBit(_) => print!("{event}"),
            _ => println!("{event}"),
        }
        let _ = io::stdout().flush();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_keys() {
        assert_eq!(parse_key("x"), Some(Key::Abort));
        assert_eq!(parse_key(" x \r"), Some(Key::Abort));
        assert_eq!(parse_key("\u{4}"), Some(Key::Abort));
        assert_eq!(parse_key("t"), Some(Key::ToggleTrack0));
        assert_eq!(parse_key("tt"), None);
        assert_eq!(parse_key(""), None);
    }

    #[test]
    fn test_poll_after_disconnect() {
        let (tx, rx) = mpsc::channel();
        let mut console = SerialConsole { rx, closed: false };

        tx.send("t".to_string()).unwrap();
        tx.send("x".to_string()).unwrap();
        drop(tx);

        assert_eq!(console.poll_key(), Some(Key::ToggleTrack0));
        assert_eq!(console.poll_key(), Some(Key::Abort));
        assert_eq!(console.poll_key(), None);
        assert!(console.closed);
        assert_eq!(console.read_line(), None);
    }
}
