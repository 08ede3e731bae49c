//! Lifecycle of a supervised worker job.
//!
//! [`Supervisor::start`] launches the worker and returns a [`JobHandle`]. Behind
//! it, one thread runs the cancellation monitor while a second thread relays
//! the worker's output. Once the output has closed, or a cancelled job's
//! leftovers have been terminated, the outcome is classified and reported as
//! the last event of the job.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::arguments::JobInvocation;
use crate::cancellation::CancellationToken;
use crate::config::{expand_working_directory, JobConfig, SupervisionTiming};
use crate::error::{Error, Result};
use crate::launcher::launch;
use crate::monitor::CancellationMonitor;
use crate::parameters::ParameterSet;
use crate::process::{WorkerControl, WorkerOutput};
use crate::relay::relay_output;
use crate::reporter::{classify, report, JobOutcome};
use crate::sink::{JobEvent, Sink};

struct ActiveJob {
    token: CancellationToken,
    thread: JoinHandle<()>,
}

/// Runs at most one worker job at a time.
pub struct Supervisor {
    config: JobConfig,
    timing: SupervisionTiming,
    active: Option<ActiveJob>,
}

impl Supervisor {
    pub fn new(config: JobConfig) -> Self {
        let timing = config.timing();
        Self {
            config,
            timing,
            active: None,
        }
    }

    #[must_use]
    pub fn with_timing(mut self, timing: SupervisionTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn timing(&self) -> SupervisionTiming {
        self.timing
    }

    /// The command line a job with `parameters` would run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyCommand`] if no worker program is configured.
    pub fn invocation(&self, parameters: &ParameterSet) -> Result<JobInvocation> {
        JobInvocation::new(&self.config.command, parameters)
    }

    /// True while the current job's monitor or relay is still running.
    pub fn is_active(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|job| !job.thread.is_finished())
    }

    /// Launches a new job.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JobAlreadyActive`] while the previous job is still
    /// running, or a launch error if the worker could not be started.
    pub fn start(&mut self, parameters: &ParameterSet) -> Result<JobHandle> {
        if self.is_active() {
            return Err(Error::JobAlreadyActive);
        }
        self.join();

        let invocation = self.invocation(parameters)?;
        let working_directory = expand_working_directory(&self.config.working_directory);
        let (worker, output) = launch(
            &invocation,
            working_directory.as_deref(),
            self.config.environment.as_ref(),
        )?;

        let token = CancellationToken::new();
        let (sender, receiver) = mpsc::channel();
        let _ = sender.send(JobEvent::Clear);
        let _ = sender.send(JobEvent::Line("Starting PRIMME simulation...".to_string()));

        let job_token = token.clone();
        let timing = self.timing;
        // On failure the closure is dropped, which kills the worker.
        let thread = thread::Builder::new()
            .name("primme-monitor".to_string())
            .spawn(move || supervise(worker, output, job_token, timing, sender))?;

        self.active = Some(ActiveJob {
            token: token.clone(),
            thread,
        });

        Ok(JobHandle {
            token,
            events: receiver,
            outcome: None,
        })
    }

    /// Requests cancellation of the running job.
    ///
    /// Returns `true` only for the request that set the cancellation flag.
    pub fn cancel(&self) -> bool {
        match &self.active {
            Some(job) if !job.thread.is_finished() => job.token.cancel(),
            _ => false,
        }
    }

    /// Blocks until the current job's threads have finished.
    pub fn join(&mut self) {
        if let Some(job) = self.active.take() {
            if job.thread.join().is_err() {
                error!("Job supervision thread panicked");
            }
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        if self.cancel() {
            info!("Supervisor dropped with a running job, cancelling it");
        }
        self.join();
    }
}

fn supervise<W: WorkerControl, O: WorkerOutput + 'static>(
    worker: W,
    output: O,
    token: CancellationToken,
    timing: SupervisionTiming,
    events: Sender<JobEvent>,
) {
    let relay_token = token.clone();
    let relay_events = events.clone();
    // Not scoped: a process that escaped the worker's group can hold the output
    // open indefinitely, and the job must still finish once it is cancelled.
    let relay = thread::Builder::new()
        .name("primme-relay".to_string())
        .spawn(move || relay_output(output, &relay_token, &relay_events));

    if let Err(e) = &relay {
        error!("Could not start output relay: {e}");
        let _ = events.send(JobEvent::Line(format!("Error reading output: {e}")));
    }

    let output_closed = || relay.as_ref().map_or(true, JoinHandle::is_finished);
    let monitor_report =
        CancellationMonitor::new(worker, token.clone(), timing, events.clone())
            .run_until(output_closed);

    match relay {
        Ok(relay) if relay.is_finished() => match relay.join() {
            Ok(forwarded) => debug!("Relay forwarded {forwarded} lines"),
            Err(_) => {
                error!("Output relay panicked");
                let _ = events.send(JobEvent::Line(
                    "Error reading output: relay stopped unexpectedly".to_string(),
                ));
            }
        },
        // Cancelled, so the relay forwards nothing more once its read returns.
        Ok(_) => warn!("Detaching output relay still blocked on the worker's output"),
        Err(_) => {}
    }

    debug!("Monitor finished: {monitor_report:?}");
    report(
        classify(token.is_cancelled(), monitor_report.exit_code),
        &events,
    );
}

/// Caller side of a running job.
///
/// Events are delivered to a [`Sink`] only from the thread that owns the
/// handle, in the order the job produced them.
pub struct JobHandle {
    token: CancellationToken,
    events: Receiver<JobEvent>,
    outcome: Option<JobOutcome>,
}

impl JobHandle {
    /// Requests cancellation. Returns `true` only for the request that set the flag.
    pub fn cancel(&self) -> bool {
        self.token.cancel()
    }

    /// The outcome, once it has been delivered.
    pub fn outcome(&self) -> Option<JobOutcome> {
        self.outcome
    }

    /// Delivers every event already queued without blocking.
    pub fn try_deliver(&mut self, sink: &mut dyn Sink) -> Option<JobOutcome> {
        while self.outcome.is_none() {
            match self.events.try_recv() {
                Ok(event) => self.outcome = event.deliver(sink),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => self.outcome = Some(self.lost(sink)),
            }
        }

        self.outcome
    }

    /// Waits up to `timeout` for the next event, then delivers everything queued.
    pub fn deliver_timeout(
        &mut self,
        sink: &mut dyn Sink,
        timeout: Duration,
    ) -> Option<JobOutcome> {
        if self.outcome.is_some() {
            return self.outcome;
        }

        match self.events.recv_timeout(timeout) {
            Ok(event) => {
                self.outcome = event.deliver(sink);
                self.try_deliver(sink)
            }
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                self.outcome = Some(self.lost(sink));
                self.outcome
            }
        }
    }

    /// Delivers events until the job has finished.
    pub fn wait(&mut self, sink: &mut dyn Sink) -> JobOutcome {
        loop {
            if let Some(outcome) = self.outcome {
                return outcome;
            }

            self.outcome = match self.events.recv() {
                Ok(event) => event.deliver(sink),
                Err(_) => Some(self.lost(sink)),
            };
        }
    }

    fn lost(&self, sink: &mut dyn Sink) -> JobOutcome {
        error!("Job events ended without an outcome");
        let outcome = classify(self.token.is_cancelled(), None);
        sink.append(&outcome.to_string());
        outcome
    }
}
