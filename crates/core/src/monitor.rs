//! Cancellation monitor: watches the cancellation token and the worker's
//! liveness, and escalates from a graceful interrupt to forced termination.
//!
//! ```text
//! Watching ──token set──▶ SignalSent ──grace window elapsed──▶ Escalated
//!    │                        │                                   │
//!    └──worker exited──▶ Done ◀──worker exited────────────────────┘
//! ```
//!
//! Each state signals the worker at most once.
//!
//! Processes the worker started may hold its output open after it has exited.
//! Until the output closes the monitor keeps watching the token, and a
//! cancellation then signals whatever is left of the worker's process group.

use std::sync::mpsc::Sender;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::cancellation::CancellationToken;
use crate::config::SupervisionTiming;
use crate::process::WorkerControl;
use crate::sink::JobEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Watching,
    SignalSent,
    Escalated,
    Done,
}

/// What the monitor observed by the time the worker was gone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorReport {
    /// `None` if the exit status could not be collected.
    pub exit_code: Option<i32>,
    pub interrupted: bool,
    pub escalated: bool,
}

pub struct CancellationMonitor<W: WorkerControl> {
    worker: W,
    token: CancellationToken,
    timing: SupervisionTiming,
    events: Sender<JobEvent>,
    state: MonitorState,
    stopping: bool,
    interrupted: bool,
    escalated: bool,
}

impl<W: WorkerControl> CancellationMonitor<W> {
    pub fn new(
        worker: W,
        token: CancellationToken,
        timing: SupervisionTiming,
        events: Sender<JobEvent>,
    ) -> Self {
        Self {
            worker,
            token,
            timing,
            events,
            state: MonitorState::Watching,
            stopping: false,
            interrupted: false,
            escalated: false,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Drives the state machine to `Done` and reaps the worker.
    pub fn run(self) -> MonitorReport {
        self.run_until(|| true)
    }

    /// Like [`run`](Self::run), then keeps acting on the token until
    /// `output_closed` returns true or the leftovers have been terminated.
    pub fn run_until(mut self, output_closed: impl Fn() -> bool) -> MonitorReport {
        while self.state != MonitorState::Done {
            let next = match self.state {
                MonitorState::Watching => self.watch(),
                MonitorState::SignalSent => self.offer_grace_window(),
                MonitorState::Escalated => self.escalate(),
                MonitorState::Done => MonitorState::Done,
            };
            debug!("Monitor {:?} -> {:?}", self.state, next);
            self.state = next;
        }

        let exit_code = if self.worker_alive() {
            warn!("Worker could not be stopped, leaving it behind");
            self.notice("Worker could not be stopped.".to_string());
            None
        } else {
            match self.worker.wait() {
                Ok(code) => Some(code),
                Err(e) => {
                    warn!("Could not collect worker exit status: {e}");
                    self.notice(format!("Error collecting exit status: {e}"));
                    None
                }
            }
        };

        self.linger(&output_closed);

        MonitorReport {
            exit_code,
            interrupted: self.interrupted,
            escalated: self.escalated,
        }
    }

    fn notice(&self, line: String) {
        let _ = self.events.send(JobEvent::Line(line));
    }

    fn worker_alive(&mut self) -> bool {
        match self.worker.is_alive() {
            Ok(alive) => alive,
            Err(e) => {
                warn!("Liveness check failed, treating worker as exited: {e}");
                false
            }
        }
    }

    fn watch(&mut self) -> MonitorState {
        loop {
            if !self.worker_alive() {
                return MonitorState::Done;
            }

            if self.token.is_cancelled() {
                return MonitorState::SignalSent;
            }

            thread::sleep(self.timing.poll_interval);
        }
    }

    fn announce_stop(&mut self) {
        if !self.stopping {
            self.stopping = true;
            self.notice("Stopping PRIMME simulation...".to_string());
        }
    }

    /// Polls `done` until it holds or `window` has elapsed.
    fn wait_for(&self, done: impl Fn() -> bool, window: Duration) -> bool {
        let deadline = Instant::now() + window;
        loop {
            if done() {
                return true;
            }

            let now = Instant::now();
            if now >= deadline {
                return false;
            }

            thread::sleep(self.timing.poll_interval.min(deadline - now));
        }
    }

    fn offer_grace_window(&mut self) -> MonitorState {
        self.announce_stop();
        info!("Interrupting worker, grace window {:?}", self.timing.grace_window);

        if let Err(e) = self.worker.send_interrupt() {
            warn!("Interrupt delivery failed: {e}");
            self.notice(format!("Error during termination: {e}"));
            return if self.worker_alive() {
                MonitorState::Escalated
            } else {
                MonitorState::Done
            };
        }
        self.interrupted = true;

        let deadline = Instant::now() + self.timing.grace_window;
        loop {
            if !self.worker_alive() {
                return MonitorState::Done;
            }

            let now = Instant::now();
            if now >= deadline {
                return MonitorState::Escalated;
            }

            thread::sleep(self.timing.poll_interval.min(deadline - now));
        }
    }

    fn escalate(&mut self) -> MonitorState {
        warn!(
            "Worker still running {:?} after interrupt, forcing termination",
            self.timing.grace_window
        );
        self.notice("Worker did not stop in time, forcing termination.".to_string());

        match self.worker.force_terminate() {
            Ok(()) => {
                self.escalated = true;
                while self.worker_alive() {
                    thread::sleep(self.timing.poll_interval);
                }
            }
            Err(e) => {
                warn!("Forced termination failed: {e}");
                self.notice(format!("Error during termination: {e}"));
                // Nothing else can stop the worker, so give it one more window.
                let deadline = Instant::now() + self.timing.grace_window;
                while self.worker_alive() && Instant::now() < deadline {
                    thread::sleep(self.timing.poll_interval);
                }
            }
        }

        MonitorState::Done
    }

    /// Waits for the output to close after the worker has been reaped.
    ///
    /// A cancellation seen here interrupts the worker's process group, then
    /// kills it after the grace window. If the output is still open one grace
    /// window after that, the monitor stops waiting for it.
    fn linger(&mut self, output_closed: &dyn Fn() -> bool) {
        loop {
            if output_closed() {
                return;
            }

            if self.token.is_cancelled() {
                break;
            }

            thread::sleep(self.timing.poll_interval);
        }

        info!("Cancellation requested while the worker's output is still open");
        let grace_window = self.timing.grace_window;

        if !self.stopping {
            self.announce_stop();
            match self.worker.send_interrupt() {
                Ok(()) => self.interrupted = true,
                Err(e) => debug!("Could not interrupt the worker's group: {e}"),
            }

            if self.wait_for(output_closed, grace_window) {
                return;
            }
        }

        match self.worker.force_terminate() {
            Ok(()) => self.escalated = true,
            Err(e) => debug!("Could not kill the worker's group: {e}"),
        }

        if !self.wait_for(output_closed, grace_window) {
            warn!("Worker output still open after termination, no longer waiting for it");
        }
    }
}
