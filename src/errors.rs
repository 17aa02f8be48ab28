// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::process::Process;

#[derive(Error, Debug)]
pub enum TermrunError {
    /// The builder was given something it cannot execute, for example an
    /// output sink of an unsupported shape or an empty command line.
    /// Raised before any process is spawned.
    #[error("Configuration error: {0}")]
    InvalidConfiguration(String),

    /// The operating system refused to spawn the child process.
    #[error("Failed to start process `{command}`: {source}")]
    ProcessStart {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The process ran to completion but finished unsuccessfully. Carries
    /// the process handle so callers can inspect output and exit status.
    #[error("{}", failure_label(.process))]
    ProcessFailed { process: Process },

    /// A builder extension was invoked under a name nobody registered.
    #[error("Call to undefined builder method `{0}`")]
    MethodNotFound(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TermrunError {
    /// The process handle attached to a [`TermrunError::ProcessFailed`]
    /// error, `None` for every other variant.
    pub fn process(&self) -> Option<&Process> {
        match self {
            TermrunError::ProcessFailed { process } => Some(process),
            _ => None,
        }
    }
}

fn failure_label(process: &Process) -> String {
    if process.timed_out() {
        return format!("Process `{}` timed out", process.command_line());
    }
    match process.exit_code() {
        Some(code) => format!(
            "Process `{}` failed with exit code {code}",
            process.command_line()
        ),
        None => format!(
            "Process `{}` failed without an exit code",
            process.command_line()
        ),
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TermrunError>;
