use std::fmt::{Display, Formatter};

use crate::error::{Error, Result};
use crate::parameters::{ParameterSet, ParameterValue};

/// Turns a parameter set into worker option tokens.
///
/// Entries are visited in insertion order. Absent values, empty strings and
/// `false` produce nothing, `true` produces a bare `--name` flag, and anything
/// else produces a single `--name=value` token.
pub fn build_arguments(parameters: &ParameterSet) -> Vec<String> {
    let mut arguments = Vec::with_capacity(parameters.len());

    for (name, value) in parameters.iter() {
        let Some(value) = value else {
            continue;
        };

        match value {
            ParameterValue::Bool(true) => arguments.push(format!("--{name}")),
            ParameterValue::Bool(false) => {}
            value if value.is_blank() => {}
            value => arguments.push(format!("--{name}={value}")),
        }
    }

    arguments
}

/// A fully resolved worker command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobInvocation {
    pub program: String,
    pub arguments: Vec<String>,
}

impl JobInvocation {
    /// Builds the invocation from the configured worker command followed by
    /// the option tokens of `parameters`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EmptyCommand`] if `command` has no program.
    pub fn new(command: &[String], parameters: &ParameterSet) -> Result<Self> {
        let Some((program, leading)) = command.split_first() else {
            return Err(Error::EmptyCommand);
        };

        if program.trim().is_empty() {
            return Err(Error::EmptyCommand);
        }

        let mut arguments = leading.to_vec();
        arguments.extend(build_arguments(parameters));

        Ok(Self {
            program: program.clone(),
            arguments,
        })
    }
}

impl Display for JobInvocation {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(&self.program)?;
        for argument in &self.arguments {
            write!(formatter, " {argument}")?;
        }
        Ok(())
    }
}
