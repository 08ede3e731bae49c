//! Delivery of job output to the presentation layer.
//!
//! Background contexts never touch a [`Sink`] directly. They send
//! [`JobEvent`]s over a channel and the owner of the sink drains them on its
//! own loop, in the order they were sent.

use crate::reporter::JobOutcome;

/// Consumer of ordered output lines.
pub trait Sink {
    fn clear(&mut self);
    fn append(&mut self, line: &str);
}

impl Sink for Vec<String> {
    fn clear(&mut self) {
        Vec::clear(self);
    }

    fn append(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobEvent {
    Clear,
    Line(String),
    /// Always the last event of a job.
    Finished(JobOutcome),
}

impl JobEvent {
    /// Hands the event to `sink`, returning the outcome if this was the final event.
    pub fn deliver(self, sink: &mut dyn Sink) -> Option<JobOutcome> {
        match self {
            Self::Clear => {
                sink.clear();
                None
            }
            Self::Line(line) => {
                sink.append(&line);
                None
            }
            Self::Finished(outcome) => Some(outcome),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deliver_to_vec_sink() {
        let mut sink: Vec<String> = vec!["stale".to_string()];

        assert_eq!(JobEvent::Clear.deliver(&mut sink), None);
        assert_eq!(JobEvent::Line("one".to_string()).deliver(&mut sink), None);
        assert_eq!(
            JobEvent::Finished(JobOutcome::Succeeded).deliver(&mut sink),
            Some(JobOutcome::Succeeded)
        );

        assert_eq!(sink, vec!["one"]);
    }
}
