// src/fake/response.rs

//! Canned response descriptions.

use crate::command::CommandLine;
use crate::output::OutputLine;
use crate::process::Process;
use crate::response::Response;

/// Describes the response a faked command should produce: its output lines
/// and exit code. Built fluently and materialized with
/// [`FakeResponse::build`], which attaches a synthetic, already-finished
/// process handle.
#[derive(Debug, Clone, Default)]
pub struct FakeResponse {
    lines: Vec<OutputLine>,
    exit_code: i32,
    command: Option<CommandLine>,
}

impl FakeResponse {
    /// An empty successful response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a stdout line.
    pub fn line(mut self, content: impl Into<String>) -> Self {
        self.lines.push(OutputLine::out(content));
        self
    }

    /// Append a stderr line.
    pub fn error_line(mut self, content: impl Into<String>) -> Self {
        self.lines.push(OutputLine::err(content));
        self
    }

    /// Append pre-built lines, preserving their stream tags.
    pub fn lines(mut self, lines: impl IntoIterator<Item = OutputLine>) -> Self {
        self.lines.extend(lines);
        self
    }

    /// Set the exit code.
    pub fn exit_code(mut self, code: i32) -> Self {
        self.exit_code = code;
        self
    }

    /// Make the response report failure (exit code 1).
    pub fn should_fail(self) -> Self {
        self.exit_code(1)
    }

    /// Make the response report success (exit code 0).
    pub fn should_succeed(self) -> Self {
        self.exit_code(0)
    }

    /// Set the command the synthetic process handle reports. The fake
    /// registry fills this in with the executed command on every hit.
    pub fn command(mut self, command: impl Into<CommandLine>) -> Self {
        self.command = Some(command.into());
        self
    }

    /// Materialize into a [`Response`] backed by a synthetic finished
    /// process.
    pub fn build(self) -> Response {
        let command = self.command.unwrap_or_default();
        Response::new(Process::completed(command, self.lines, self.exit_code))
    }
}
