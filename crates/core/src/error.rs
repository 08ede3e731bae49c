use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to launch worker `{}`: {}", .program, .source)]
    Launch {
        program: String,
        source: std::io::Error,
    },

    #[error("A job is already running. Stop it before starting another one.")]
    JobAlreadyActive,

    #[error("The worker command is empty. Set `command` in the job file.")]
    EmptyCommand,

    #[error("Error {} {} file at `{}`: {}", .action, .file_description, .path, .original)]
    Yaml {
        action: String,
        file_description: String,
        path: String,
        original: serde_yaml::Error,
    },

    #[error("IO error with {} at path `{}`: {}", .description, .path, .original)]
    Io {
        description: String,
        path: String,
        original: std::io::Error,
    },

    #[error("Parameter should be in the format `key=value`, got: `{}`", .0)]
    ParameterFormat(String),

    #[error("Parameter `{}` must be between {} and {}, got: {}", .name, .min, .max, .value)]
    ParameterRange {
        name: String,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("No plot or video matches `{}`", .0)]
    NoSuchArtifact(String),

    #[error("`{}` could not open `{}` (exit status {:?})", .program, .path, .code)]
    Open {
        program: String,
        path: String,
        code: Option<i32>,
    },

    #[error("STDIO error: {}", .0)]
    Stdio(#[from] std::io::Error),
}

impl Error {
    pub fn launch_error(program: String, source: std::io::Error) -> Self {
        Self::Launch { program, source }
    }

    pub fn yaml_error(
        action: String,
        file_description: String,
        path: String,
        original: serde_yaml::Error,
    ) -> Self {
        Self::Yaml {
            action,
            file_description,
            path,
            original,
        }
    }

    pub fn io_error(description: String, path: String, original: std::io::Error) -> Self {
        Self::Io {
            description,
            path,
            original,
        }
    }
}
