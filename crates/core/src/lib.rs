//! PRIMME Runner Core Library
//!
//! This crate launches the PRIMME simulation worker as an external process,
//! relays its output line by line while it runs, and lets the user stop it
//! with an interrupt that escalates to forced termination.
//!
//! # Key Features
//!
//! - **Argument Building**: Turn a parameter set into worker option tokens
//! - **Job Supervision**: One job at a time, with ordered output delivery
//! - **Cooperative Cancellation**: Interrupt first, force-terminate after a grace window
//! - **Outcome Reporting**: Exactly one terminal outcome per job
//! - **Result Listing**: Plots, videos and data files produced by the worker
//!
//! # Examples
//!
//! Running a job and collecting its output:
//!
//! ```no_run
//! use primme_runner_core::config::JobConfig;
//! use primme_runner_core::supervisor::Supervisor;
//!
//! let config = JobConfig::default();
//! let parameters = config.parameters.clone();
//! let mut supervisor = Supervisor::new(config);
//!
//! let mut job = supervisor.start(&parameters)?;
//! let mut lines: Vec<String> = Vec::new();
//! let outcome = job.wait(&mut lines);
//! println!("{outcome}");
//! # Ok::<(), primme_runner_core::error::Error>(())
//! ```

pub mod arguments;
pub mod artifacts;
pub mod cancellation;
pub mod config;
pub mod error;
pub mod file_handling;
pub mod launcher;
pub mod monitor;
pub mod parameters;
pub mod process;
pub mod relay;
pub mod reporter;
pub mod sink;
pub mod supervisor;
