use std::fmt::{Display, Formatter};
use std::sync::mpsc::Sender;

use log::info;

use crate::sink::JobEvent;

pub const SUCCESS_EXIT_CODE: i32 = 0;

/// Exit code reported when the worker's status could not be collected.
pub const UNKNOWN_EXIT_CODE: i32 = -1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed(i32),
    CancelledByUser,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

impl Display for JobOutcome {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Succeeded => formatter.write_str("Process completed successfully!"),
            Self::Failed(code) => write!(formatter, "Process failed with return code {code}"),
            Self::CancelledByUser => formatter.write_str("Process terminated by user."),
        }
    }
}

/// Classifies a finished job. A cancellation request wins over any exit code.
pub fn classify(cancelled: bool, exit_code: Option<i32>) -> JobOutcome {
    if cancelled {
        return JobOutcome::CancelledByUser;
    }

    match exit_code {
        Some(SUCCESS_EXIT_CODE) => JobOutcome::Succeeded,
        Some(code) => JobOutcome::Failed(code),
        None => JobOutcome::Failed(UNKNOWN_EXIT_CODE),
    }
}

/// Posts the terminal line followed by the outcome itself.
pub fn report(outcome: JobOutcome, events: &Sender<JobEvent>) {
    info!("Job finished: {outcome:?}");
    let _ = events.send(JobEvent::Line(outcome.to_string()));
    let _ = events.send(JobEvent::Finished(outcome));
}
