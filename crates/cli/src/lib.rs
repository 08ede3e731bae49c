//! PRIMME Runner CLI Library
//!
//! This crate provides the command-line front end for primme-runner. It loads
//! the job configuration, starts the simulation worker, prints the worker's
//! output as it arrives and turns Ctrl-C into a cancellation request.
//!
//! # Architecture
//!
//! - [`cli_args`]: Command-line argument parsing and run overrides
//! - [`console`]: Terminal sink for job output
//! - [`interrupt`]: Ctrl-C to cancellation bridge
//! - [`listing`]: Rendering of result and data listings
//!
//! # Examples
//!
//! ```bash
//! # Run with the configured parameters
//! prun run
//!
//! # Override worker options
//! prun run -p nsteps=500 -p if_plot=true
//!
//! # Show the command line only
//! prun run --dry-run
//!
//! # List plots and videos, then open the second one
//! prun results
//! prun results --open 2
//!
//! # Write the default job file to ~/.primme-runner/job.yml
//! prun init
//! ```

pub mod cli_args;
pub mod console;
pub mod interrupt;
pub mod listing;
