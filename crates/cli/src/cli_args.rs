//! Command-line argument parsing.
//!
//! This module defines the command-line interface structure using the `clap`
//! crate and applies run options on top of the loaded job configuration.

use clap::{Parser, Subcommand};
use primme_runner_core::config::JobConfig;
use primme_runner_core::error::Result;

/// Command-line arguments for the `prun` binary.
///
/// # Examples
///
/// ```rust
/// use clap::Parser;
/// use primme_runner_cli::cli_args::Args;
///
/// let args = Args::parse_from(["prun", "run", "-p", "nsteps=10"]);
/// ```
#[derive(Parser, Debug)]
#[command(term_width = 0)] // Just to make testing across clap features easier
pub struct Args {
    /// Path to the job definition YAML.
    ///
    /// If not provided, defaults to `~/.primme-runner/job.yml`, falling back to
    /// the built-in PRIMME defaults when that file does not exist.
    #[arg(long, short = 'c', global = true)]
    pub config_path: Option<String>,

    #[command(subcommand)]
    pub action: Action,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Action {
    /// Run the simulation worker and stream its output. Ctrl-C stops it.
    Run(RunArgs),

    /// List plots and videos in the plots directory.
    Results(ResultsArgs),

    /// List training sets, models and simulations in the data directory.
    Data,

    /// Write a job file with the built-in PRIMME defaults.
    Init(InitArgs),
}

#[derive(clap::Args, Debug, Default, PartialEq, Eq)]
pub struct ResultsArgs {
    /// Open a plot or video, chosen by its number in the listing or by its title.
    #[arg(long, short = 'o')]
    pub open: Option<String>,
}

#[derive(clap::Args, Debug, Default, PartialEq, Eq)]
pub struct InitArgs {
    /// Replace an existing job file.
    #[arg(long, short = 'f', action)]
    pub force: bool,
}

#[derive(clap::Args, Debug, Default, PartialEq, Eq)]
pub struct RunArgs {
    /// Worker option in the format key=value. An empty value leaves the option out.
    ///
    /// # Examples
    /// ```bash
    /// prun run -p nsteps=500 -p if_plot=true -p modelname=
    /// ```
    #[arg(long = "param", short = 'p', action = clap::ArgAction::Append)]
    pub parameters: Vec<String>,

    /// Print the worker command line without running it.
    #[arg(long, short = 'd', action)]
    pub dry_run: bool,

    /// How often the cancellation flag and worker liveness are checked.
    #[arg(long)]
    pub poll_interval_ms: Option<u64>,

    /// How long the worker may take to exit after an interrupt before it is killed.
    #[arg(long)]
    pub grace_window_ms: Option<u64>,

    /// Number of grains as a power of two, applied after the `-p` overrides.
    #[arg(long, short = 'g')]
    pub ngrain_exponent: Option<u32>,
}

impl RunArgs {
    /// Applies the run options on top of `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if a parameter is not in the `key=value` format or the
    /// grain exponent is out of range.
    pub fn apply_to(&self, config: &mut JobConfig) -> Result<()> {
        config.parameters.apply_overrides(&self.parameters)?;

        if let Some(exponent) = self.ngrain_exponent {
            config.parameters.set_ngrain_exponent(exponent)?;
        }

        if let Some(poll_interval_ms) = self.poll_interval_ms {
            config.poll_interval_ms = poll_interval_ms;
        }

        if let Some(grace_window_ms) = self.grace_window_ms {
            config.grace_window_ms = grace_window_ms;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use primme_runner_core::parameters::ParameterValue;

    #[test]
    fn test_run_defaults() {
        let args = Args::parse_from(["prun", "run"]);

        assert!(args.config_path.is_none());
        assert_eq!(args.action, Action::Run(RunArgs::default()));
    }

    #[test]
    fn test_run_flags() {
        let args = Args::parse_from([
            "prun",
            "run",
            "-c",
            "/custom/job.yml",
            "-d",
            "-p",
            "nsteps=10",
            "--param",
            "if_plot=true",
            "--poll-interval-ms",
            "50",
            "--grace-window-ms",
            "2000",
        ]);

        assert_eq!(args.config_path, Some("/custom/job.yml".to_string()));
        let Action::Run(run) = args.action else {
            panic!("Expected run action");
        };
        assert!(run.dry_run);
        assert_eq!(run.parameters, vec!["nsteps=10", "if_plot=true"]);
        assert_eq!(run.poll_interval_ms, Some(50));
        assert_eq!(run.grace_window_ms, Some(2000));
    }

    #[test]
    fn test_config_path_is_global() {
        let args = Args::parse_from(["prun", "--config-path", "/a.yml", "results"]);
        assert_eq!(args.config_path, Some("/a.yml".to_string()));
        assert_eq!(args.action, Action::Results(ResultsArgs::default()));

        let args = Args::parse_from(["prun", "data", "-c", "/b.yml"]);
        assert_eq!(args.config_path, Some("/b.yml".to_string()));
        assert_eq!(args.action, Action::Data);
    }

    #[test]
    fn test_missing_action_is_error() {
        assert!(Args::try_parse_from(["prun"]).is_err());
    }

    #[test]
    fn test_apply_to_config() {
        let run = RunArgs {
            parameters: vec!["nsteps=10".to_string(), "modelname=".to_string()],
            dry_run: false,
            poll_interval_ms: Some(25),
            grace_window_ms: None,
            ngrain_exponent: None,
        };
        let mut config = JobConfig::default();

        run.apply_to(&mut config).unwrap();

        assert_eq!(
            config.parameters.get("nsteps"),
            Some(&ParameterValue::Integer(10))
        );
        assert!(config.parameters.get("modelname").is_none());
        assert_eq!(config.poll_interval_ms, 25);
        assert_eq!(config.grace_window_ms, 500);
    }

    #[test]
    fn test_apply_to_rejects_bad_parameter() {
        let run = RunArgs {
            parameters: vec!["nsteps".to_string()],
            ..RunArgs::default()
        };
        assert!(run.apply_to(&mut JobConfig::default()).is_err());
    }

    #[test]
    fn test_results_open() {
        let args = Args::parse_from(["prun", "results", "--open", "Grain Growth"]);
        assert_eq!(
            args.action,
            Action::Results(ResultsArgs {
                open: Some("Grain Growth".to_string())
            })
        );

        let args = Args::parse_from(["prun", "results", "-o", "2"]);
        assert_eq!(
            args.action,
            Action::Results(ResultsArgs {
                open: Some("2".to_string())
            })
        );
    }

    #[test]
    fn test_init_force() {
        let args = Args::parse_from(["prun", "init"]);
        assert_eq!(args.action, Action::Init(InitArgs { force: false }));

        let args = Args::parse_from(["prun", "init", "-f", "-c", "/tmp/job.yml"]);
        assert_eq!(args.action, Action::Init(InitArgs { force: true }));
        assert_eq!(args.config_path, Some("/tmp/job.yml".to_string()));
    }

    #[test]
    fn test_ngrain_exponent_applies_after_overrides() {
        let run = RunArgs {
            parameters: vec!["grain_shape=grain".to_string()],
            ngrain_exponent: Some(12),
            ..RunArgs::default()
        };
        let mut config = JobConfig::default();

        run.apply_to(&mut config).unwrap();
        assert_eq!(
            config.parameters.get("ngrain"),
            Some(&ParameterValue::Integer(4096))
        );

        let run = RunArgs {
            ngrain_exponent: Some(20),
            ..RunArgs::default()
        };
        assert!(run.apply_to(&mut JobConfig::default()).is_err());
    }
}
