//! Job configuration and path utilities for primme-runner.
//!
//! This module defines the job file structure, the supervision timing policy,
//! and functions for resolving configuration paths and expanding shell
//! variables like `~` in paths.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::parameters::ParameterSet;

/// Default path for the job configuration file
const DEFAULT_CONFIG_PATH: &str = "~/.primme-runner/job.yml";

/// Default interval between cancellation/liveness polls
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;
/// Default time a worker gets to exit after an interrupt
pub const DEFAULT_GRACE_WINDOW_MS: u64 = 500;

pub const DEFAULT_DATA_DIRECTORY: &str = "./data";
pub const DEFAULT_PLOTS_DIRECTORY: &str = "./plots";

fn default_command() -> Vec<String> {
    vec![
        "python3".to_string(),
        "-u".to_string(),
        "run_script.py".to_string(),
    ]
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_grace_window_ms() -> u64 {
    DEFAULT_GRACE_WINDOW_MS
}

fn default_data_directory() -> String {
    DEFAULT_DATA_DIRECTORY.to_string()
}

fn default_plots_directory() -> String {
    DEFAULT_PLOTS_DIRECTORY.to_string()
}

/// Timing policy for the cancellation monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisionTiming {
    pub poll_interval: Duration,
    pub grace_window: Duration,
}

impl SupervisionTiming {
    pub fn from_millis(poll_interval_ms: u64, grace_window_ms: u64) -> Self {
        Self {
            poll_interval: Duration::from_millis(poll_interval_ms.max(1)),
            grace_window: Duration::from_millis(grace_window_ms),
        }
    }
}

impl Default for SupervisionTiming {
    fn default() -> Self {
        Self::from_millis(DEFAULT_POLL_INTERVAL_MS, DEFAULT_GRACE_WINDOW_MS)
    }
}

/// Everything needed to launch and supervise the worker.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct JobConfig {
    /// Worker program followed by its fixed leading arguments.
    #[serde(default = "default_command")]
    pub command: Vec<String>,
    pub working_directory: Option<String>,
    pub environment: Option<HashMap<String, String>>,
    #[serde(default = "ParameterSet::primme_defaults")]
    pub parameters: ParameterSet,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_grace_window_ms")]
    pub grace_window_ms: u64,
    #[serde(default = "default_data_directory")]
    pub data_directory: String,
    #[serde(default = "default_plots_directory")]
    pub plots_directory: String,
}

impl JobConfig {
    pub fn timing(&self) -> SupervisionTiming {
        SupervisionTiming::from_millis(self.poll_interval_ms, self.grace_window_ms)
    }

    /// Resolves a directory from the job file relative to the working directory.
    pub fn resolve_directory(&self, directory: &str) -> String {
        let expanded = shellexpand::tilde(directory).to_string();
        match expand_working_directory(&self.working_directory) {
            Some(base) if !std::path::Path::new(&expanded).is_absolute() => {
                std::path::Path::new(&base)
                    .join(&expanded)
                    .to_string_lossy()
                    .to_string()
            }
            _ => expanded,
        }
    }

    pub fn data_directory(&self) -> String {
        self.resolve_directory(&self.data_directory)
    }

    pub fn plots_directory(&self) -> String {
        self.resolve_directory(&self.plots_directory)
    }
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            working_directory: None,
            environment: None,
            parameters: ParameterSet::primme_defaults(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            grace_window_ms: DEFAULT_GRACE_WINDOW_MS,
            data_directory: default_data_directory(),
            plots_directory: default_plots_directory(),
        }
    }
}

/// Resolves the configuration file path.
///
/// If a custom path is provided, uses that path. Otherwise, uses the default
/// configuration path. Shell expansions like `~` are resolved.
///
/// # Examples
///
/// ```
/// use primme_runner_core::config::get_config_path;
///
/// let default_path = get_config_path(&None);
/// let custom_path = get_config_path(&Some("/path/to/job.yml".to_string()));
/// ```
pub fn get_config_path(config_path_arg: &Option<String>) -> String {
    let config_path = match config_path_arg {
        Some(config_path) => config_path,
        None => DEFAULT_CONFIG_PATH,
    };

    shellexpand::tilde(config_path).to_string()
}

/// Expands shell variables in a working directory path.
///
/// # Examples
///
/// ```
/// use primme_runner_core::config::expand_working_directory;
///
/// let expanded = expand_working_directory(&Some("~/simulations".to_string()));
/// assert!(expanded.is_some());
///
/// assert!(expand_working_directory(&None).is_none());
/// ```
pub fn expand_working_directory(working_directory: &Option<String>) -> Option<String> {
    working_directory
        .as_ref()
        .map(|directory| shellexpand::tilde(directory).to_string())
}
