// src/command.rs

//! Command-line representations accepted by the builder.
//!
//! - `Shell`: one opaque line handed to the platform shell, eligible for
//!   `{{ $name }}` placeholder binding.
//! - `Argv`: an explicit program plus argument vector, spawned directly and
//!   never templated.

use std::fmt;

/// A command to execute, as a raw shell line or an argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandLine {
    /// A single line run through the platform shell (`sh -c` / `cmd /C`).
    Shell(String),
    /// A program and its arguments, spawned without a shell in between.
    Argv(Vec<String>),
}

impl CommandLine {
    /// Canonical textual rendering. Shell lines render verbatim; argument
    /// vectors are joined with shell quoting, so both forms of the same
    /// command produce an identical string.
    ///
    /// This rendering is the identity the fake layer matches on: registry
    /// keys and executed-command assertions both go through it.
    pub fn render(&self) -> String {
        match self {
            CommandLine::Shell(line) => line.clone(),
            CommandLine::Argv(argv) => shell_words::join(argv),
        }
    }

    /// True when there is nothing to execute.
    pub fn is_empty(&self) -> bool {
        match self {
            CommandLine::Shell(line) => line.trim().is_empty(),
            CommandLine::Argv(argv) => argv.is_empty(),
        }
    }

    /// The raw shell line, if this is the shell form.
    pub fn as_shell(&self) -> Option<&str> {
        match self {
            CommandLine::Shell(line) => Some(line),
            CommandLine::Argv(_) => None,
        }
    }

    /// The argument vector, if this is the argv form.
    pub fn as_argv(&self) -> Option<&[String]> {
        match self {
            CommandLine::Shell(_) => None,
            CommandLine::Argv(argv) => Some(argv),
        }
    }
}

impl Default for CommandLine {
    fn default() -> Self {
        CommandLine::Argv(Vec::new())
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

impl From<&str> for CommandLine {
    fn from(line: &str) -> Self {
        CommandLine::Shell(line.to_string())
    }
}

impl From<String> for CommandLine {
    fn from(line: String) -> Self {
        CommandLine::Shell(line)
    }
}

impl From<Vec<String>> for CommandLine {
    fn from(argv: Vec<String>) -> Self {
        CommandLine::Argv(argv)
    }
}

impl From<Vec<&str>> for CommandLine {
    fn from(argv: Vec<&str>) -> Self {
        CommandLine::Argv(argv.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for CommandLine {
    fn from(argv: &[&str]) -> Self {
        CommandLine::Argv(argv.iter().map(|arg| arg.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for CommandLine {
    fn from(argv: [&str; N]) -> Self {
        CommandLine::Argv(argv.into_iter().map(str::to_string).collect())
    }
}
