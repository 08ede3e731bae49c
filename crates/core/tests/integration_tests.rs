//! Integration tests for primme-runner-core
//!
//! These tests run real worker processes through the supervisor and check the
//! complete job lifecycle end-to-end.
#![cfg(unix)]

use primme_runner_core::{
    config::{JobConfig, SupervisionTiming},
    error::Error,
    file_handling::get_job_config,
    parameters::ParameterSet,
    reporter::JobOutcome,
    sink::Sink,
    supervisor::{JobHandle, Supervisor},
};
use std::io::Write;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

fn shell_config(script: &str) -> JobConfig {
    JobConfig {
        command: vec![
            "sh".to_string(),
            "-c".to_string(),
            script.to_string(),
            "worker".to_string(),
        ],
        ..JobConfig::default()
    }
}

fn fast_supervisor(script: &str) -> Supervisor {
    Supervisor::new(shell_config(script)).with_timing(SupervisionTiming {
        poll_interval: Duration::from_millis(10),
        grace_window: Duration::from_millis(200),
    })
}

/// Delivers events until `line` shows up in the sink.
fn wait_for_line(handle: &mut JobHandle, sink: &mut Vec<String>, line: &str) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while !sink.iter().any(|l| l == line) {
        assert!(Instant::now() < deadline, "timed out waiting for `{line}`");
        if handle
            .deliver_timeout(sink, Duration::from_millis(20))
            .is_some()
        {
            panic!("job finished before `{line}` appeared: {sink:?}");
        }
    }
}

/// Sink that records clears so tests can check they came first.
#[derive(Default)]
struct RecordingSink {
    entries: Vec<String>,
    clears: usize,
}

impl Sink for RecordingSink {
    fn clear(&mut self) {
        self.clears += 1;
        self.entries.clear();
    }

    fn append(&mut self, line: &str) {
        self.entries.push(line.to_string());
    }
}

#[test]
fn test_lines_then_success_line() {
    let mut supervisor = fast_supervisor("echo L1; echo L2 1>&2; echo L3");
    let mut handle = supervisor.start(&ParameterSet::new()).unwrap();
    let mut sink = RecordingSink::default();

    let outcome = handle.wait(&mut sink);

    assert_eq!(outcome, JobOutcome::Succeeded);
    assert_eq!(sink.clears, 1);
    assert_eq!(
        sink.entries,
        vec![
            "Starting PRIMME simulation...",
            "L1",
            "L2",
            "L3",
            "Process completed successfully!",
        ]
    );
}

#[test]
fn test_exit_code_two_is_failure() {
    let mut supervisor = fast_supervisor("echo working; exit 2");
    let mut handle = supervisor.start(&ParameterSet::new()).unwrap();
    let mut sink: Vec<String> = Vec::new();

    let outcome = handle.wait(&mut sink);

    assert_eq!(outcome, JobOutcome::Failed(2));
    assert!(sink.last().unwrap().contains('2'));
    assert_eq!(sink[sink.len() - 2], "working");
}

#[test]
fn test_parameters_reach_worker_as_arguments() {
    let mut supervisor = fast_supervisor("for a in \"$@\"; do echo \"$a\"; done");
    let mut parameters = ParameterSet::new();
    parameters
        .set("flag", true)
        .set("name", "")
        .set("count", 5_i64)
        .set("off", false)
        .unset("modelname");

    let mut handle = supervisor.start(&parameters).unwrap();
    let mut sink: Vec<String> = Vec::new();
    handle.wait(&mut sink);

    assert_eq!(
        sink,
        vec![
            "Starting PRIMME simulation...",
            "--flag",
            "--count=5",
            "Process completed successfully!",
        ]
    );
}

#[test]
fn test_cancelled_cooperative_worker() {
    let mut supervisor =
        fast_supervisor("trap 'exit 3' INT; echo ready; while :; do sleep 0.05; done");
    let mut handle = supervisor.start(&ParameterSet::new()).unwrap();
    let mut sink: Vec<String> = Vec::new();

    wait_for_line(&mut handle, &mut sink, "ready");
    assert!(handle.cancel());

    let outcome = handle.wait(&mut sink);

    assert_eq!(outcome, JobOutcome::CancelledByUser);
    assert_eq!(sink.last().unwrap(), "Process terminated by user.");
    assert!(sink.contains(&"Stopping PRIMME simulation...".to_string()));
    assert!(!sink
        .iter()
        .any(|line| line.contains("forcing termination")));
}

#[test]
fn test_worker_ignoring_interrupt_is_force_terminated() {
    let mut supervisor =
        fast_supervisor("trap '' INT; echo ready; while :; do sleep 0.05; done");
    let mut handle = supervisor.start(&ParameterSet::new()).unwrap();
    let mut sink: Vec<String> = Vec::new();

    wait_for_line(&mut handle, &mut sink, "ready");
    let cancelled_at = Instant::now();
    assert!(supervisor.cancel());
    // Further requests change nothing.
    assert!(!supervisor.cancel());
    assert!(!handle.cancel());

    let outcome = handle.wait(&mut sink);

    assert_eq!(outcome, JobOutcome::CancelledByUser);
    assert!(cancelled_at.elapsed() >= Duration::from_millis(200));

    let stopping = sink
        .iter()
        .position(|l| l == "Stopping PRIMME simulation...")
        .unwrap();
    let forcing = sink
        .iter()
        .position(|l| l == "Worker did not stop in time, forcing termination.")
        .unwrap();
    assert!(stopping < forcing);
    assert_eq!(
        sink.iter()
            .filter(|l| *l == "Stopping PRIMME simulation...")
            .count(),
        1
    );
    assert_eq!(sink.last().unwrap(), "Process terminated by user.");
}

#[test]
fn test_cancel_after_worker_exit_stops_what_it_left_behind() {
    // The background sleep keeps the output open after the shell has exited.
    let mut supervisor = fast_supervisor("echo ready; sleep 30 &");
    let mut handle = supervisor.start(&ParameterSet::new()).unwrap();
    let mut sink: Vec<String> = Vec::new();

    wait_for_line(&mut handle, &mut sink, "ready");
    std::thread::sleep(Duration::from_millis(300));
    assert!(supervisor.is_active());
    assert_eq!(handle.try_deliver(&mut sink), None);

    let cancelled_at = Instant::now();
    assert!(handle.cancel());
    let outcome = handle.wait(&mut sink);

    assert_eq!(outcome, JobOutcome::CancelledByUser);
    assert!(cancelled_at.elapsed() < Duration::from_secs(5));
    assert!(sink.contains(&"Stopping PRIMME simulation...".to_string()));
    assert_eq!(sink.last().unwrap(), "Process terminated by user.");

    supervisor.join();
    assert!(!supervisor.is_active());
}

#[test]
fn test_second_job_rejected_while_first_runs() {
    let mut supervisor = fast_supervisor("echo ready; sleep 5");
    let mut first = supervisor.start(&ParameterSet::new()).unwrap();
    let mut sink: Vec<String> = Vec::new();

    wait_for_line(&mut first, &mut sink, "ready");
    assert!(supervisor.is_active());
    assert!(matches!(
        supervisor.start(&ParameterSet::new()),
        Err(Error::JobAlreadyActive)
    ));

    first.cancel();
    assert_eq!(first.wait(&mut sink), JobOutcome::CancelledByUser);
    supervisor.join();
    assert!(!supervisor.is_active());

    // Once the first job is done a new one may start.
    let mut second = supervisor.start(&ParameterSet::new()).unwrap();
    second.cancel();
    let mut second_sink: Vec<String> = Vec::new();
    assert_eq!(second.wait(&mut second_sink), JobOutcome::CancelledByUser);
}

#[test]
fn test_outcome_is_last_and_delivered_once() {
    let mut supervisor = fast_supervisor("echo only");
    let mut handle = supervisor.start(&ParameterSet::new()).unwrap();
    let mut sink: Vec<String> = Vec::new();

    let outcome = handle.wait(&mut sink);
    let delivered = sink.len();

    assert_eq!(handle.outcome(), Some(outcome));
    assert_eq!(handle.try_deliver(&mut sink), Some(outcome));
    assert_eq!(
        handle.deliver_timeout(&mut sink, Duration::from_millis(10)),
        Some(outcome)
    );
    assert_eq!(sink.len(), delivered);
}

#[test]
fn test_job_config_file_drives_supervisor() {
    let yaml_content = r#"
command: ["sh", "-c", "echo \"$GRAIN_SHAPE\" \"$@\"", "worker"]
environment:
  GRAIN_SHAPE: "hex"
poll_interval_ms: 5
grace_window_ms: 50
parameters:
  grain_size: 443
  if_plot: false
"#;

    let mut temp_file = NamedTempFile::new().unwrap();
    write!(temp_file, "{yaml_content}").unwrap();
    let config = get_job_config(temp_file.path().to_str().unwrap(), true).unwrap();
    let parameters = config.parameters.clone();

    let mut supervisor = Supervisor::new(config);
    assert_eq!(
        supervisor.timing(),
        SupervisionTiming::from_millis(5, 50)
    );

    let mut handle = supervisor.start(&parameters).unwrap();
    let mut sink: Vec<String> = Vec::new();
    assert_eq!(handle.wait(&mut sink), JobOutcome::Succeeded);
    assert_eq!(sink[1], "hex --grain_size=443");
}
