use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use itertools::Itertools;
use log::{debug, info};
use primme_runner_cli::cli_args::{Action, Args, InitArgs, ResultsArgs, RunArgs};
use primme_runner_cli::console::ConsoleSink;
use primme_runner_cli::{interrupt, listing};
use primme_runner_core::artifacts::{open_artifact, scan_artifacts, scan_data_files};
use primme_runner_core::config::{self, JobConfig};
use primme_runner_core::error::{Error, Result};
use primme_runner_core::file_handling;
use primme_runner_core::supervisor::Supervisor;

/// How long the delivery loop waits for output before checking for Ctrl-C.
const DELIVERY_TICK: Duration = Duration::from_millis(50);

fn load_config(args: &Args) -> Result<JobConfig> {
    let config_path = config::get_config_path(&args.config_path);
    debug!("Config path: `{}`", config_path);

    // Only an explicitly given job file has to exist.
    file_handling::get_job_config(&config_path, args.config_path.is_some())
}

fn print_invocation(supervisor: &Supervisor, config: &JobConfig) -> Result<()> {
    let invocation = supervisor.invocation(&config.parameters)?;
    println!("Executing command:\n{invocation}");

    if let Some(environment) = config.environment.as_ref() {
        println!("With environment:");
        for (key, value) in environment.iter().sorted() {
            println!("\t\"{key}\": \"{value}\"");
        }
    }

    Ok(())
}

fn run(mut config: JobConfig, run_args: &RunArgs) -> Result<ExitCode> {
    run_args.apply_to(&mut config)?;
    let parameters = config.parameters.clone();
    let mut supervisor = Supervisor::new(config.clone());

    print_invocation(&supervisor, &config)?;

    if run_args.dry_run {
        println!("Dry run is specified, exiting without executing.");
        return Ok(ExitCode::SUCCESS);
    }

    file_handling::ensure_output_directories(&config)?;
    interrupt::install()?;

    let mut job = supervisor.start(&parameters)?;
    let mut sink = ConsoleSink::new();

    let outcome = loop {
        if interrupt::take() && job.cancel() {
            info!("Cancellation requested from the terminal");
        }

        if let Some(outcome) = job.deliver_timeout(&mut sink, DELIVERY_TICK) {
            break outcome;
        }
    };

    supervisor.join();

    Ok(if outcome.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn results(config: &JobConfig, results_args: &ResultsArgs) -> Result<ExitCode> {
    let listing = scan_artifacts(config.plots_directory());

    let Some(selector) = results_args.open.as_deref() else {
        for line in listing::format_artifacts(&listing) {
            println!("{line}");
        }
        return Ok(ExitCode::SUCCESS);
    };

    let artifact = listing
        .find(selector)
        .ok_or_else(|| Error::NoSuchArtifact(selector.to_string()))?;
    println!("Opening {}", artifact.path.display());
    open_artifact(artifact)?;

    Ok(ExitCode::SUCCESS)
}

fn init(args: &Args, init_args: &InitArgs) -> Result<ExitCode> {
    let config_path = config::get_config_path(&args.config_path);
    file_handling::write_job_config(&config_path, &JobConfig::default(), init_args.force)?;
    println!("Wrote job file to `{config_path}`");

    Ok(ExitCode::SUCCESS)
}

fn execute() -> Result<ExitCode> {
    let args = Args::parse();

    match &args.action {
        Action::Init(init_args) => init(&args, init_args),
        Action::Run(run_args) => run(load_config(&args)?, run_args),
        Action::Results(results_args) => results(&load_config(&args)?, results_args),
        Action::Data => {
            let config = load_config(&args)?;
            let catalog = scan_data_files(config.data_directory());
            for line in listing::format_catalog(&catalog) {
                println!("{line}");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn main() -> ExitCode {
    env_logger::init();

    match execute() {
        Ok(exit_code) => exit_code,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}
