use std::sync::mpsc::Sender;

use log::{debug, warn};

use crate::cancellation::CancellationToken;
use crate::process::WorkerOutput;
use crate::sink::JobEvent;

/// Forwards the worker's output line by line until the stream ends.
///
/// Stops forwarding as soon as cancellation is requested; the remaining
/// output of a job being torn down is dropped. A read error is reported as a
/// line and ends the relay. The stream is closed on every exit path.
///
/// Returns the number of lines forwarded.
pub fn relay_output<O: WorkerOutput>(
    mut output: O,
    token: &CancellationToken,
    events: &Sender<JobEvent>,
) -> usize {
    let mut forwarded = 0;

    loop {
        if token.is_cancelled() {
            debug!("Cancellation requested, relay stops forwarding");
            break;
        }

        match output.read_line() {
            Ok(Some(line)) => {
                if token.is_cancelled() {
                    break;
                }
                if events.send(JobEvent::Line(line)).is_err() {
                    debug!("Event receiver gone, relay stops");
                    break;
                }
                forwarded += 1;
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Error reading worker output: {e}");
                let _ = events.send(JobEvent::Line(format!("Error reading output: {e}")));
                break;
            }
        }
    }

    output.close();
    forwarded
}
