// src/fake/mod.rs

//! Fake execution layer.
//!
//! When a [`Terminal`](crate::terminal::Terminal) is switched into fake
//! mode, builders stop spawning real processes. Each execution instead
//! appends a [`CapturedCommand`] snapshot to the context's capture log and
//! answers from a registry of canned responses keyed by the command's
//! canonical rendering. Unregistered commands get an empty successful
//! response, so test code never has to register commands it does not care
//! about.

mod response;

pub use response::FakeResponse;

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::Duration;

use crate::builder::RetryPolicy;
use crate::command::CommandLine;
use crate::output::OutputLine;
use crate::response::Response;

/// Snapshot of a builder configuration, taken at execution time by the
/// fake layer. Matching predicates receive these.
#[derive(Debug, Clone)]
pub struct CapturedCommand {
    /// The configured command, untouched by template compilation.
    pub command: CommandLine,
    /// Canonical rendering of `command`; what registry keys match against.
    pub rendered: String,
    /// Placeholder bindings at execution time.
    pub bindings: BTreeMap<String, String>,
    pub cwd: Option<PathBuf>,
    pub env: BTreeMap<String, String>,
    /// True when the child would not inherit the parent environment.
    pub env_clear: bool,
    /// Bytes that would have been fed to the child's stdin.
    pub input: Option<Vec<u8>>,
    /// Resolved overall timeout, `None` when disabled.
    pub timeout: Option<Duration>,
    pub idle_timeout: Option<Duration>,
    /// `None` when the builder left TTY mode unspecified.
    pub tty: Option<bool>,
    pub background: bool,
    pub retries: RetryPolicy,
}

/// A registered reply for one command: either a canned description
/// materialized into a fresh response per hit, or a fixed custom response
/// returned as-is.
#[derive(Debug, Clone)]
pub enum FakeEntry {
    Canned(FakeResponse),
    Custom(Response),
}

impl FakeEntry {
    /// Produce the response for one execution of `command`.
    ///
    /// Canned entries are materialized per hit so that repeated executions
    /// get independent line cursors; custom responses share their handle by
    /// construction.
    pub(crate) fn respond(&self, command: &CommandLine) -> Response {
        match self {
            FakeEntry::Canned(fake) => fake.clone().command(command.clone()).build(),
            FakeEntry::Custom(response) => response.clone(),
        }
    }
}

impl From<FakeResponse> for FakeEntry {
    fn from(fake: FakeResponse) -> Self {
        FakeEntry::Canned(fake)
    }
}

impl From<Response> for FakeEntry {
    fn from(response: Response) -> Self {
        FakeEntry::Custom(response)
    }
}

impl From<&str> for FakeEntry {
    fn from(line: &str) -> Self {
        FakeEntry::Canned(FakeResponse::new().line(line))
    }
}

impl From<String> for FakeEntry {
    fn from(line: String) -> Self {
        FakeEntry::Canned(FakeResponse::new().line(line))
    }
}

impl From<OutputLine> for FakeEntry {
    fn from(line: OutputLine) -> Self {
        FakeEntry::Canned(FakeResponse::new().lines([line]))
    }
}

impl From<Vec<&str>> for FakeEntry {
    fn from(lines: Vec<&str>) -> Self {
        FakeEntry::Canned(lines.into_iter().fold(FakeResponse::new(), |fake, line| {
            fake.line(line)
        }))
    }
}

impl From<Vec<String>> for FakeEntry {
    fn from(lines: Vec<String>) -> Self {
        FakeEntry::Canned(lines.into_iter().fold(FakeResponse::new(), |fake, line| {
            fake.line(line)
        }))
    }
}

impl From<Vec<OutputLine>> for FakeEntry {
    fn from(lines: Vec<OutputLine>) -> Self {
        FakeEntry::Canned(FakeResponse::new().lines(lines))
    }
}

impl<const N: usize> From<[&str; N]> for FakeEntry {
    fn from(lines: [&str; N]) -> Self {
        FakeEntry::Canned(lines.into_iter().fold(FakeResponse::new(), |fake, line| {
            fake.line(line)
        }))
    }
}

impl<const N: usize> From<[OutputLine; N]> for FakeEntry {
    fn from(lines: [OutputLine; N]) -> Self {
        FakeEntry::Canned(FakeResponse::new().lines(lines))
    }
}

/// Registry plus capture log of one faked terminal context.
#[derive(Debug, Default)]
pub(crate) struct FakeState {
    pub(crate) registry: HashMap<String, FakeEntry>,
    pub(crate) captured: Vec<CapturedCommand>,
}

impl FakeState {
    pub(crate) fn count_rendered(&self, rendered: &str) -> usize {
        self.captured
            .iter()
            .filter(|captured| captured.rendered == rendered)
            .count()
    }

    pub(crate) fn count_matching(&self, pred: &dyn Fn(&CapturedCommand) -> bool) -> usize {
        self.captured.iter().filter(|captured| pred(captured)).count()
    }
}
