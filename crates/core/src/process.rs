//! Owned handles around a running worker process.
//!
//! The worker is split in two at launch: [`ChildWorker`] controls the process
//! and is owned by the cancellation monitor, [`PipeOutput`] owns the merged
//! stdout/stderr stream and is owned by the output relay. Terminating the
//! process while a read is blocked makes that read return end-of-stream.

use std::io::{self, BufRead, BufReader, PipeReader};
use std::process::{Child, ExitStatus};

use log::{debug, warn};

/// Control surface of a running worker.
pub trait WorkerControl: Send {
    /// Returns `false` once the worker has exited.
    fn is_alive(&mut self) -> io::Result<bool>;

    /// Asks the worker to shut down cooperatively.
    fn send_interrupt(&mut self) -> io::Result<()>;

    /// Stops the worker without its cooperation.
    fn force_terminate(&mut self) -> io::Result<()>;

    /// Blocks until the worker exits and returns its exit code.
    ///
    /// A worker killed by a signal reports the negated signal number.
    fn wait(&mut self) -> io::Result<i32>;
}

/// Line source for the worker's merged output stream.
pub trait WorkerOutput: Send {
    /// Reads the next complete line without its terminator, `None` at end-of-stream.
    fn read_line(&mut self) -> io::Result<Option<String>>;

    /// Releases the stream. Further reads report end-of-stream.
    fn close(&mut self);
}

pub struct ChildWorker {
    child: Child,
    exit_code: Option<i32>,
}

impl ChildWorker {
    pub fn new(child: Child) -> Self {
        Self {
            child,
            exit_code: None,
        }
    }

    #[cfg(unix)]
    fn pid(&self) -> io::Result<nix::unistd::Pid> {
        i32::try_from(self.child.id())
            .map(nix::unistd::Pid::from_raw)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))
    }

    #[cfg(unix)]
    fn signal_group(&mut self, signal: nix::sys::signal::Signal) -> io::Result<()> {
        use nix::sys::signal::killpg;

        let pid = self.pid()?;
        debug!("Sending {signal} to worker group {pid}");
        // The worker leads its own process group, so its children get the signal too.
        // The group outlives the worker while any of those children are still running.
        killpg(pid, signal).map_err(io::Error::from)
    }

    /// Signals the worker's group, or the worker alone if it has left that group.
    #[cfg(unix)]
    fn signal(&mut self, signal: nix::sys::signal::Signal) -> io::Result<()> {
        use nix::sys::signal::kill;

        let group_error = match self.signal_group(signal) {
            Ok(()) => return Ok(()),
            Err(e) => e,
        };

        // An unreaped worker still owns its pid, so signalling it directly is safe.
        if self.exit_code.is_some() {
            return Err(group_error);
        }

        debug!("Worker group unreachable ({group_error}), signalling the worker alone");
        kill(self.pid()?, signal).map_err(io::Error::from)
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return -signal;
        }
    }

    -1
}

impl WorkerControl for ChildWorker {
    fn is_alive(&mut self) -> io::Result<bool> {
        if self.exit_code.is_some() {
            return Ok(false);
        }

        match self.child.try_wait()? {
            Some(status) => {
                self.exit_code = Some(exit_code(status));
                Ok(false)
            }
            None => Ok(true),
        }
    }

    #[cfg(unix)]
    fn send_interrupt(&mut self) -> io::Result<()> {
        self.signal(nix::sys::signal::Signal::SIGINT)
    }

    #[cfg(not(unix))]
    fn send_interrupt(&mut self) -> io::Result<()> {
        self.child.kill()
    }

    #[cfg(unix)]
    fn force_terminate(&mut self) -> io::Result<()> {
        match self.signal_group(nix::sys::signal::Signal::SIGKILL) {
            Ok(()) => Ok(()),
            Err(e) => {
                debug!("Worker group unreachable ({e}), killing the worker alone");
                self.child.kill()
            }
        }
    }

    #[cfg(not(unix))]
    fn force_terminate(&mut self) -> io::Result<()> {
        self.child.kill()
    }

    fn wait(&mut self) -> io::Result<i32> {
        if let Some(code) = self.exit_code {
            return Ok(code);
        }

        let code = exit_code(self.child.wait()?);
        self.exit_code = Some(code);
        Ok(code)
    }
}

impl Drop for ChildWorker {
    fn drop(&mut self) {
        if matches!(self.is_alive(), Ok(false)) {
            return;
        }

        warn!("Worker {} dropped while running, killing it", self.child.id());
        match self.force_terminate() {
            Ok(()) => {
                let _ = self.child.wait();
            }
            Err(e) => warn!("Could not kill worker on drop: {e}"),
        }
    }
}

/// Reading end of the pipe shared by the worker's stdout and stderr.
pub struct PipeOutput {
    reader: Option<BufReader<PipeReader>>,
}

impl PipeOutput {
    pub fn new(reader: PipeReader) -> Self {
        Self {
            reader: Some(BufReader::new(reader)),
        }
    }
}

impl WorkerOutput for PipeOutput {
    fn read_line(&mut self) -> io::Result<Option<String>> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };

        let mut buffer = Vec::new();
        if reader.read_until(b'\n', &mut buffer)? == 0 {
            return Ok(None);
        }

        if buffer.last() == Some(&b'\n') {
            buffer.pop();
            if buffer.last() == Some(&b'\r') {
                buffer.pop();
            }
        }

        Ok(Some(String::from_utf8_lossy(&buffer).into_owned()))
    }

    fn close(&mut self) {
        self.reader = None;
    }
}
