// src/builder.rs

//! Fluent command builder and the bounded retry loop.
//!
//! A builder is obtained from a [`Terminal`] context, configured through
//! chained setters, and consumed by [`Builder::execute`] (or one of its
//! conveniences). Each execution attempt re-derives a frozen process spec
//! from the builder, so template compilation never mutates the configured
//! command and retries spawn a fresh child every time.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::command::CommandLine;
use crate::errors::{Result, TermrunError};
use crate::output::{OutputSink, StreamTag};
use crate::process::{Process, ProcessSpec};
use crate::response::Response;
use crate::template;
use crate::terminal::Terminal;

/// Overall timeout applied when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Retry policy: total attempt count and the pause between attempts.
///
/// `times` counts attempts, not re-runs; `times == 1` means a single
/// attempt whose response is returned as-is, successful or not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub times: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            times: 1,
            delay: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimeoutSpec {
    Default,
    Disabled,
    After(Duration),
    At(Instant),
}

/// Fluent configuration for one command execution.
///
/// Cloning snapshots the configuration: later changes to either copy do
/// not affect the other. The execution context and any output sink are
/// shared between clones.
#[derive(Clone)]
pub struct Builder {
    context: Terminal,
    command: CommandLine,
    bindings: BTreeMap<String, String>,
    cwd: Option<PathBuf>,
    env: BTreeMap<String, String>,
    env_clear: bool,
    input: Option<Vec<u8>>,
    timeout: TimeoutSpec,
    idle_timeout: Option<Duration>,
    tty: Option<bool>,
    background: bool,
    retries: RetryPolicy,
    sink: Option<OutputSink>,
}

impl Builder {
    pub(crate) fn new(context: Terminal) -> Self {
        Self {
            context,
            command: CommandLine::default(),
            bindings: BTreeMap::new(),
            cwd: None,
            env: BTreeMap::new(),
            env_clear: false,
            input: None,
            timeout: TimeoutSpec::Default,
            idle_timeout: None,
            tty: None,
            background: false,
            retries: RetryPolicy::default(),
            sink: None,
        }
    }

    /// Set the command to execute. Strings are shell lines eligible for
    /// `{{ $name }}` placeholders; vectors are spawned directly.
    pub fn command(mut self, command: impl Into<CommandLine>) -> Self {
        self.command = command.into();
        self
    }

    /// The configured command, untouched by template compilation.
    pub fn get_command(&self) -> &CommandLine {
        &self.command
    }

    /// Bind one placeholder value.
    pub fn with(mut self, name: impl Into<String>, value: impl ToString) -> Self {
        self.bindings.insert(name.into(), value.to_string());
        self
    }

    /// Bind several placeholder values at once. Later bindings win on
    /// name collisions.
    pub fn with_many<K, V>(mut self, bindings: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: ToString,
    {
        for (name, value) in bindings {
            self.bindings.insert(name.into(), value.to_string());
        }
        self
    }

    /// Run the command in `dir` instead of the parent's working directory.
    pub fn in_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Add one environment variable for the child.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Replace the configured environment variables wholesale.
    pub fn env_vars<K, V>(mut self, vars: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.env = vars
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();
        self
    }

    /// Do not inherit the parent environment; the child sees only the
    /// configured variables.
    pub fn env_clear(mut self) -> Self {
        self.env_clear = true;
        self
    }

    /// Bytes written to the child's stdin, which is closed afterwards.
    pub fn input(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.input = Some(input.into());
        self
    }

    /// Forward live output to a callback invoked with `(tag, line)`.
    pub fn output(mut self, f: impl FnMut(StreamTag, &str) + Send + 'static) -> Self {
        self.sink = Some(OutputSink::callback(f));
        self
    }

    /// Forward live output to a prepared sink (writer or console-command
    /// adapter).
    pub fn output_sink(mut self, sink: OutputSink) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Forward live output to a type-erased sink from a host framework.
    /// Unsupported shapes are rejected here, before anything is spawned.
    pub fn output_any(mut self, value: Box<dyn Any + Send>) -> Result<Self> {
        self.sink = Some(OutputSink::from_any(value)?);
        Ok(self)
    }

    /// Kill the process when its total runtime exceeds `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = TimeoutSpec::After(timeout);
        self
    }

    /// Kill the process when it is still running at `deadline`. The
    /// remaining duration is measured when an attempt starts.
    pub fn timeout_at(mut self, deadline: Instant) -> Self {
        self.timeout = TimeoutSpec::At(deadline);
        self
    }

    /// Let the process run as long as it likes.
    pub fn no_timeout(mut self) -> Self {
        self.timeout = TimeoutSpec::Disabled;
        self
    }

    /// Kill the process when it stays silent (no output on either stream)
    /// for `timeout`.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = Some(timeout);
        self
    }

    /// Hand the child the parent terminal instead of piped streams. Output
    /// is not captured in TTY mode.
    pub fn tty(mut self, tty: bool) -> Self {
        self.tty = Some(tty);
        self
    }

    /// Shorthand for `tty(true)`.
    pub fn enable_tty(self) -> Self {
        self.tty(true)
    }

    /// Shorthand for `tty(false)`.
    pub fn disable_tty(self) -> Self {
        self.tty(false)
    }

    /// Start the process without waiting for it; the returned response is a
    /// live view that can be polled or awaited. Background runs make a
    /// single attempt regardless of the retry policy.
    pub fn in_background(mut self) -> Self {
        self.background = true;
        self
    }

    /// Attempt the command up to `times` times, pausing `delay` between
    /// attempts. Zero is treated as a single attempt.
    pub fn retries(mut self, times: u32, delay: Duration) -> Self {
        self.retries = RetryPolicy { times, delay };
        self
    }

    /// Invoke a builder extension registered on the context under `name`.
    pub fn call(self, name: &str) -> Result<Self> {
        match self.context.extension(name) {
            Some(extension) => Ok(extension(self)),
            None => Err(TermrunError::MethodNotFound(name.to_string())),
        }
    }

    /// Canonical text of the configured command, the identity used by the
    /// fake registry and executed-command assertions.
    pub fn render(&self) -> String {
        self.command.render()
    }

    /// Build an unstarted process handle from the current configuration.
    /// Placeholder compilation happens here; calling this repeatedly always
    /// starts from the original command text.
    pub fn process(&self) -> Result<Process> {
        Ok(Process::new(self.spec()?))
    }

    /// Execute the command through the retry loop and return its response.
    ///
    /// With `times > 1`, failed attempts are retried after the configured
    /// delay and the last failure is returned as a
    /// [`ProcessFailed`](TermrunError::ProcessFailed) error. With a single
    /// attempt the response is returned as-is, successful or not. Spawn
    /// failures abort immediately and are never retried.
    pub async fn execute(self) -> Result<Response> {
        let times = self.retries.times.max(1);
        let delay = self.retries.delay;
        let builder = self;
        let mut attempt = 0u32;

        debug!(command = %builder.render(), attempts = times, "executing command");

        loop {
            attempt += 1;
            let response = builder.execute_once().await?;

            if builder.background || times <= 1 || response.successful() {
                return Ok(response);
            }
            if attempt >= times {
                debug!(command = %builder.render(), attempt, "retries exhausted");
                return response.throw();
            }

            warn!(
                command = %builder.render(),
                attempt,
                remaining = times - attempt,
                delay_ms = delay.as_millis() as u64,
                "command failed; retrying"
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    /// Set the command and execute in one go.
    pub async fn run(self, command: impl Into<CommandLine>) -> Result<Response> {
        self.command(command).execute().await
    }

    /// Set the command and an output callback, then execute.
    pub async fn run_with(
        self,
        command: impl Into<CommandLine>,
        f: impl FnMut(StreamTag, &str) + Send + 'static,
    ) -> Result<Response> {
        self.command(command).output(f).execute().await
    }

    /// Execute without waiting for completion.
    pub async fn execute_in_background(self) -> Result<Response> {
        self.in_background().execute().await
    }

    async fn execute_once(&self) -> Result<Response> {
        if let Some(response) = self.context.intercept(self) {
            return Ok(response);
        }

        let process = self.process()?;
        let sink = self.sink.clone();
        if self.background {
            process.start(sink)?;
        } else {
            process.run(sink).await?;
        }
        Ok(Response::new(process))
    }

    fn spec(&self) -> Result<ProcessSpec> {
        if self.command.is_empty() {
            return Err(TermrunError::InvalidConfiguration(
                "cannot execute an empty command".to_string(),
            ));
        }

        let mut env = self.env.clone();
        let command = match &self.command {
            CommandLine::Shell(line) => {
                CommandLine::Shell(template::compile(line, &self.bindings, &mut env))
            }
            argv @ CommandLine::Argv(_) => argv.clone(),
        };

        Ok(ProcessSpec {
            command,
            cwd: self.cwd.clone(),
            env,
            env_clear: self.env_clear,
            input: self.input.clone(),
            timeout: self.resolved_timeout(),
            idle_timeout: self.idle_timeout,
            tty: self.tty.unwrap_or(false),
        })
    }

    fn resolved_timeout(&self) -> Option<Duration> {
        match self.timeout {
            TimeoutSpec::Default => Some(DEFAULT_TIMEOUT),
            TimeoutSpec::Disabled => None,
            TimeoutSpec::After(timeout) => Some(timeout),
            TimeoutSpec::At(deadline) => {
                Some(deadline.saturating_duration_since(Instant::now()))
            }
        }
    }

    pub(crate) fn capture(&self) -> crate::fake::CapturedCommand {
        crate::fake::CapturedCommand {
            command: self.command.clone(),
            rendered: self.render(),
            bindings: self.bindings.clone(),
            cwd: self.cwd.clone(),
            env: self.env.clone(),
            env_clear: self.env_clear,
            input: self.input.clone(),
            timeout: self.resolved_timeout(),
            idle_timeout: self.idle_timeout,
            tty: self.tty,
            background: self.background,
            retries: self.retries,
        }
    }
}

impl fmt::Debug for Builder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("command", &self.command)
            .field("bindings", &self.bindings)
            .field("cwd", &self.cwd)
            .field("background", &self.background)
            .field("retries", &self.retries)
            .finish_non_exhaustive()
    }
}
