use std::collections::HashMap;
use std::process::{Command, Stdio};

use log::info;

use crate::arguments::JobInvocation;
use crate::error::{Error, Result};
use crate::process::{ChildWorker, PipeOutput};

/// Spawns the worker with stdout and stderr merged into a single pipe.
///
/// # Errors
///
/// Returns [`Error::Launch`] if the pipe cannot be created, the executable
/// cannot be found, or the spawn fails. No process is left running in that case.
pub fn launch<S: ::std::hash::BuildHasher>(
    invocation: &JobInvocation,
    working_directory: Option<&str>,
    environment: Option<&HashMap<String, String, S>>,
) -> Result<(ChildWorker, PipeOutput)> {
    let launch_error = |e| Error::launch_error(invocation.program.clone(), e);

    let (reader, writer) = std::io::pipe().map_err(launch_error)?;
    let error_writer = writer.try_clone().map_err(launch_error)?;

    let mut command = Command::new(&invocation.program);
    command
        .args(&invocation.arguments)
        .stdin(Stdio::null())
        .stdout(writer)
        .stderr(error_writer);

    if let Some(working_directory) = working_directory {
        command.current_dir(working_directory);
    }

    if let Some(environment) = environment {
        info!("Launching with environment variables: {:?}", environment);
        command.envs(environment);
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::CommandExt;
        // Own process group: a terminal Ctrl-C reaches the supervisor, not the worker.
        command.process_group(0);
    }

    let child = command.spawn().map_err(launch_error)?;

    // The command holds our copies of the write ends; the stream only closes
    // once they are gone.
    drop(command);

    info!("Launched worker {} (pid {})", invocation, child.id());

    Ok((ChildWorker::new(child), PipeOutput::new(reader)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_executable_is_launch_error() {
        let invocation = JobInvocation {
            program: "/this/program/does/not/exist".to_string(),
            arguments: vec![],
        };

        let result = launch::<std::hash::RandomState>(&invocation, None, None);
        match result {
            Err(Error::Launch { program, .. }) => {
                assert_eq!(program, "/this/program/does/not/exist");
            }
            _ => panic!("Expected a launch error"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_stderr_is_merged_into_output() {
        use crate::process::{WorkerControl, WorkerOutput};

        let invocation = JobInvocation {
            program: "sh".to_string(),
            arguments: vec![
                "-c".to_string(),
                "echo out; echo err 1>&2; echo \"$GRAIN\"; exit 4".to_string(),
            ],
        };
        let environment = HashMap::from([("GRAIN".to_string(), "hex".to_string())]);

        let (mut worker, mut output) = launch(&invocation, None, Some(&environment)).unwrap();

        let mut lines = Vec::new();
        while let Some(line) = output.read_line().unwrap() {
            lines.push(line);
        }

        assert_eq!(lines, vec!["out", "err", "hex"]);
        assert_eq!(worker.wait().unwrap(), 4);
        assert!(!worker.is_alive().unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_working_directory_is_applied() {
        use crate::process::WorkerOutput;

        let temp_dir = std::env::temp_dir();
        let expected = std::fs::canonicalize(&temp_dir).unwrap();

        let invocation = JobInvocation {
            program: "pwd".to_string(),
            arguments: vec!["-P".to_string()],
        };
        let (_worker, mut output) =
            launch::<std::hash::RandomState>(&invocation, temp_dir.to_str(), None).unwrap();

        let line = output.read_line().unwrap().unwrap();
        assert_eq!(std::path::PathBuf::from(line), expected);
    }

    #[cfg(unix)]
    #[test]
    fn test_termination_reaches_children_left_behind() {
        use crate::process::{WorkerControl, WorkerOutput};

        let invocation = JobInvocation {
            program: "sh".to_string(),
            arguments: vec!["-c".to_string(), "echo ready; sleep 30 &".to_string()],
        };
        let (mut worker, mut output) =
            launch::<std::hash::RandomState>(&invocation, None, None).unwrap();

        assert_eq!(output.read_line().unwrap(), Some("ready".to_string()));
        assert_eq!(worker.wait().unwrap(), 0);

        // The background sleep still holds the output open until its group is killed.
        worker.force_terminate().unwrap();
        assert_eq!(output.read_line().unwrap(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_interrupt_after_exit_signals_nobody() {
        use crate::process::WorkerControl;

        let invocation = JobInvocation {
            program: "true".to_string(),
            arguments: vec![],
        };
        let (mut worker, _output) =
            launch::<std::hash::RandomState>(&invocation, None, None).unwrap();

        assert_eq!(worker.wait().unwrap(), 0);
        assert!(worker.send_interrupt().is_err());
    }
}
