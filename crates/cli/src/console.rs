use std::io::{stdout, IsTerminal, Stdout, Write};

use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use log::warn;
use primme_runner_core::sink::Sink;

/// Prints job output to stdout.
pub struct ConsoleSink {
    stdout: Stdout,
    is_terminal: bool,
}

impl ConsoleSink {
    pub fn new() -> Self {
        let stdout = stdout();
        let is_terminal = stdout.is_terminal();
        Self {
            stdout,
            is_terminal,
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new()
    }
}

impl Sink for ConsoleSink {
    fn clear(&mut self) {
        // Redirected output keeps everything.
        if !self.is_terminal {
            return;
        }

        let result = queue!(self.stdout, Clear(ClearType::All), MoveTo(0, 0))
            .and_then(|()| self.stdout.flush());
        if let Err(e) = result {
            warn!("Could not clear the terminal: {e}");
        }
    }

    fn append(&mut self, line: &str) {
        let result = writeln!(self.stdout, "{line}").and_then(|()| self.stdout.flush());
        if let Err(e) = result {
            warn!("Could not write output line: {e}");
        }
    }
}
