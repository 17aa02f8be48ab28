// src/response.rs

//! Execution results.
//!
//! A [`Response`] is a thin view over a [`Process`] handle: the common
//! success/output queries live here, everything else is reachable through
//! [`Response::process`]. Cloning a response clones the handle, not the
//! captured output.

use std::fmt;

use crate::errors::{Result, TermrunError};
use crate::output::OutputLine;
use crate::process::Process;

/// Result of executing a command.
#[derive(Debug, Clone)]
pub struct Response {
    process: Process,
}

impl Response {
    pub(crate) fn new(process: Process) -> Self {
        Self { process }
    }

    /// True when the process finished with exit code zero.
    pub fn successful(&self) -> bool {
        self.process.successful()
    }

    /// Alias for [`Response::successful`].
    pub fn ok(&self) -> bool {
        self.successful()
    }

    /// True for a non-zero exit, a timeout kill, or a run still in flight.
    pub fn failed(&self) -> bool {
        !self.successful()
    }

    /// Exit code, once the process has finished.
    pub fn exit_code(&self) -> Option<i32> {
        self.process.exit_code()
    }

    /// Captured stdout, lines joined with `\n`.
    pub fn output(&self) -> String {
        self.process.output()
    }

    /// Captured stderr, lines joined with `\n`.
    pub fn error_output(&self) -> String {
        self.process.error_output()
    }

    /// Every captured line, tagged by stream, in arrival order. Safe to
    /// call repeatedly; a finished or faked response always yields the
    /// complete list.
    pub fn lines(&self) -> Vec<OutputLine> {
        self.process.output_lines()
    }

    /// Lines that arrived since the previous call. Single-pass: each line
    /// is yielded once. This is the polling primitive for background runs.
    pub fn new_lines(&self) -> Vec<OutputLine> {
        self.process.new_lines()
    }

    /// Pass the response through unchanged when successful, otherwise turn
    /// it into a [`ProcessFailed`](TermrunError::ProcessFailed) error
    /// carrying the process handle.
    pub fn throw(self) -> Result<Self> {
        if self.successful() {
            Ok(self)
        } else {
            Err(TermrunError::ProcessFailed {
                process: self.process,
            })
        }
    }

    /// Wait for a background run to finish.
    pub async fn wait(&self) {
        self.process.wait().await;
    }

    /// The underlying process handle, for advanced inspection (pid,
    /// environment, timeouts, running state).
    pub fn process(&self) -> &Process {
        &self.process
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.output())
    }
}

impl IntoIterator for &Response {
    type Item = OutputLine;
    type IntoIter = std::vec::IntoIter<OutputLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines().into_iter()
    }
}
