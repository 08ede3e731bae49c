//! File handling for primme-runner configuration and output directories.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use log::{debug, info};

use crate::config::JobConfig;
use crate::error::{Error, Result};

fn get_reader(file_description: &str, path: &str) -> Result<File> {
    File::open(path)
        .map_err(|e| Error::io_error(file_description.to_string(), path.to_string(), e))
}

/// Loads the job configuration from a YAML file.
///
/// When `required` is false and nothing exists at `config_path`, the built-in
/// PRIMME defaults are returned instead.
///
/// # Errors
///
/// Returns an error if:
/// - The file is required but cannot be read
/// - The YAML is malformed or doesn't match the expected structure
/// - The `command` list is empty
///
/// # Examples
///
/// ```no_run
/// use primme_runner_core::file_handling::get_job_config;
///
/// let config = get_job_config("/home/me/.primme-runner/job.yml", false)?;
/// println!("Worker: {:?}", config.command);
/// # Ok::<(), primme_runner_core::error::Error>(())
/// ```
pub fn get_job_config(config_path: &str, required: bool) -> Result<JobConfig> {
    if !required && !Path::new(config_path).exists() {
        info!("No job file at `{config_path}`, using built-in defaults");
        return Ok(JobConfig::default());
    }

    let reader = get_reader("job config", config_path)?;

    let config: JobConfig = serde_yaml::from_reader(reader).map_err(|e| {
        Error::yaml_error(
            "reading".to_string(),
            "job config".to_string(),
            config_path.to_string(),
            e,
        )
    })?;

    if config.command.is_empty() {
        return Err(Error::EmptyCommand);
    }

    debug!("Loaded job config from `{config_path}`: {:?}", config.command);

    Ok(config)
}

/// Writes a job configuration to disk as YAML, creating its directory.
///
/// # Errors
///
/// Returns an error if the file exists and `replace` is false, or if the file
/// cannot be created or serialization fails.
pub fn write_job_config(path: &str, config: &JobConfig, replace: bool) -> Result<()> {
    if !replace && Path::new(path).exists() {
        return Err(Error::io_error(
            "job config".to_string(),
            path.to_string(),
            io::Error::new(io::ErrorKind::AlreadyExists, "file already exists"),
        ));
    }

    if let Some(parent) = Path::new(path)
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
    {
        fs::create_dir_all(parent).map_err(|e| {
            Error::io_error(
                "job config directory".to_string(),
                parent.display().to_string(),
                e,
            )
        })?;
    }

    let f = File::create(path)
        .map_err(|e| Error::io_error("job config".to_string(), path.to_string(), e))?;

    serde_yaml::to_writer(f, config).map_err(|e| {
        Error::yaml_error(
            "writing".to_string(),
            "job config".to_string(),
            path.to_string(),
            e,
        )
    })
}

/// Creates the data and plots directories the worker writes into.
///
/// # Errors
///
/// Returns an error if either directory cannot be created.
pub fn ensure_output_directories(config: &JobConfig) -> Result<()> {
    for directory in [config.data_directory(), config.plots_directory()] {
        fs::create_dir_all(&directory)
            .map_err(|e| Error::io_error("output directory".to_string(), directory.clone(), e))?;
    }

    Ok(())
}
