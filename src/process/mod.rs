// src/process/mod.rs

//! Child process handles.
//!
//! [`ProcessSpec`] freezes the configuration for one execution attempt.
//! [`Process`] wraps a spec plus the observed state of the child (pid,
//! buffered output lines, exit status) behind a cheaply cloneable handle, so
//! responses, errors and background pump tasks all observe the same run.
//!
//! - [`Process::run`] drives the child to completion in the calling task.
//! - [`Process::start`] spawns the child and detaches the output pump, for
//!   background execution; [`Process::wait`] joins it later.
//!
//! Overall and idle timeouts are enforced by the pump: the child is killed
//! and the handle is marked timed out, which makes the run unsuccessful
//! rather than an error.

mod spawn;

use std::collections::BTreeMap;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

use crate::command::CommandLine;
use crate::errors::{Result, TermrunError};
use crate::output::{OutputLine, OutputSink, StreamTag};

/// Frozen configuration for one execution attempt, derived by the builder.
#[derive(Debug, Clone)]
pub(crate) struct ProcessSpec {
    pub(crate) command: CommandLine,
    pub(crate) cwd: Option<PathBuf>,
    pub(crate) env: BTreeMap<String, String>,
    pub(crate) env_clear: bool,
    pub(crate) input: Option<Vec<u8>>,
    pub(crate) timeout: Option<Duration>,
    pub(crate) idle_timeout: Option<Duration>,
    pub(crate) tty: bool,
}

#[derive(Debug, Default)]
struct ProcessState {
    started: bool,
    finished: bool,
    timed_out: bool,
    pid: Option<u32>,
    exit_code: Option<i32>,
    lines: Vec<OutputLine>,
    // High-water mark for `new_lines`.
    cursor: usize,
}

#[derive(Debug)]
struct ProcessInner {
    spec: Mutex<ProcessSpec>,
    state: Mutex<ProcessState>,
    done: Notify,
}

/// Handle on a child process: not yet started, running, or finished.
///
/// Clones share the same underlying process, so a handle stored in a
/// response or an error observes the same state as the one held by a
/// background pump.
#[derive(Debug, Clone)]
pub struct Process {
    inner: Arc<ProcessInner>,
}

impl Process {
    pub(crate) fn new(spec: ProcessSpec) -> Self {
        Self {
            inner: Arc::new(ProcessInner {
                spec: Mutex::new(spec),
                state: Mutex::new(ProcessState::default()),
                done: Notify::new(),
            }),
        }
    }

    /// Synthetic handle for an already-finished run, used by the fake layer.
    pub(crate) fn completed(
        command: CommandLine,
        lines: Vec<OutputLine>,
        exit_code: i32,
    ) -> Self {
        let process = Self::new(ProcessSpec {
            command,
            cwd: None,
            env: BTreeMap::new(),
            env_clear: false,
            input: None,
            timeout: None,
            idle_timeout: None,
            tty: false,
        });
        {
            let mut state = process.inner.state.lock().unwrap();
            state.started = true;
            state.finished = true;
            state.exit_code = Some(exit_code);
            state.lines = lines;
        }
        process
    }

    /// Run the child to completion, forwarding output to `sink` as it
    /// arrives. Returns once the child has exited (or was killed by a
    /// timeout); inspect the handle afterwards for the outcome.
    pub async fn run(&self, sink: Option<OutputSink>) -> Result<()> {
        let launched = spawn::launch(&self.inner)?;
        spawn::drive(Arc::clone(&self.inner), launched, sink).await;
        Ok(())
    }

    /// Spawn the child and detach the output pump. Spawn failures are
    /// reported immediately; everything after that is observed through the
    /// handle, typically via [`Process::wait`].
    pub fn start(&self, sink: Option<OutputSink>) -> Result<()> {
        let launched = spawn::launch(&self.inner)?;
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            spawn::drive(inner, launched, sink).await;
        });
        Ok(())
    }

    /// Wait until the child has finished. Returns immediately for a handle
    /// that already finished or was never started.
    pub async fn wait(&self) {
        loop {
            let notified = self.inner.done.notified();
            tokio::pin!(notified);
            // Enable before checking, so a completion wakeup landing
            // between the check and the await is not lost.
            notified.as_mut().enable();
            {
                let state = self.inner.state.lock().unwrap();
                if state.finished || !state.started {
                    return;
                }
            }
            notified.await;
        }
    }

    /// The compiled command, rendered to its canonical string.
    pub fn command_line(&self) -> String {
        self.inner.spec.lock().unwrap().command.render()
    }

    /// The compiled command.
    pub fn command(&self) -> CommandLine {
        self.inner.spec.lock().unwrap().command.clone()
    }

    /// Working directory the child runs in, if one was set.
    pub fn working_dir(&self) -> Option<PathBuf> {
        self.inner.spec.lock().unwrap().cwd.clone()
    }

    /// Environment passed to the child, including the variables added by
    /// placeholder compilation.
    pub fn env(&self) -> BTreeMap<String, String> {
        self.inner.spec.lock().unwrap().env.clone()
    }

    /// Overall timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.inner.spec.lock().unwrap().timeout
    }

    /// Idle (no output) timeout, if any.
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.inner.spec.lock().unwrap().idle_timeout
    }

    /// Whether the child gets the parent terminal instead of piped streams.
    pub fn is_tty(&self) -> bool {
        self.inner.spec.lock().unwrap().tty
    }

    /// Switch TTY mode. Only allowed before the process starts.
    pub fn set_tty(&self, tty: bool) -> Result<()> {
        if self.inner.state.lock().unwrap().started {
            return Err(TermrunError::InvalidConfiguration(
                "cannot change TTY mode after the process has started".to_string(),
            ));
        }
        self.inner.spec.lock().unwrap().tty = tty;
        Ok(())
    }

    /// Change the idle timeout. Only allowed before the process starts.
    pub fn set_idle_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        if self.inner.state.lock().unwrap().started {
            return Err(TermrunError::InvalidConfiguration(
                "cannot change the idle timeout after the process has started".to_string(),
            ));
        }
        self.inner.spec.lock().unwrap().idle_timeout = timeout;
        Ok(())
    }

    /// Whether stdin is attached to a real terminal that could be handed
    /// to the child.
    pub fn is_tty_supported() -> bool {
        std::io::stdin().is_terminal()
    }

    /// OS process id, once started.
    pub fn pid(&self) -> Option<u32> {
        self.inner.state.lock().unwrap().pid
    }

    /// Exit code, once finished. `None` while running or when the child was
    /// killed by a signal.
    pub fn exit_code(&self) -> Option<i32> {
        self.inner.state.lock().unwrap().exit_code
    }

    /// True once the child exited with code zero and was not timed out.
    pub fn successful(&self) -> bool {
        let state = self.inner.state.lock().unwrap();
        state.exit_code == Some(0) && !state.timed_out
    }

    /// True between spawn and exit.
    pub fn is_running(&self) -> bool {
        let state = self.inner.state.lock().unwrap();
        state.started && !state.finished
    }

    /// True once the child has been spawned.
    pub fn has_started(&self) -> bool {
        self.inner.state.lock().unwrap().started
    }

    /// True when the child was killed by the overall or idle timeout.
    pub fn timed_out(&self) -> bool {
        self.inner.state.lock().unwrap().timed_out
    }

    /// Snapshot of every output line captured so far, in arrival order.
    pub fn output_lines(&self) -> Vec<OutputLine> {
        self.inner.state.lock().unwrap().lines.clone()
    }

    /// Lines captured since the previous `new_lines` call. Advances the
    /// handle's read cursor, so this is the polling primitive for
    /// background runs.
    pub fn new_lines(&self) -> Vec<OutputLine> {
        let mut state = self.inner.state.lock().unwrap();
        let fresh = state.lines[state.cursor..].to_vec();
        state.cursor = state.lines.len();
        fresh
    }

    /// Captured stdout, lines joined with `\n`.
    pub fn output(&self) -> String {
        self.joined(StreamTag::Stdout)
    }

    /// Captured stderr, lines joined with `\n`.
    pub fn error_output(&self) -> String {
        self.joined(StreamTag::Stderr)
    }

    fn joined(&self, tag: StreamTag) -> String {
        let state = self.inner.state.lock().unwrap();
        state
            .lines
            .iter()
            .filter(|line| line.tag() == tag)
            .map(OutputLine::content)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
