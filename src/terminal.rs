// src/terminal.rs

//! Execution context.
//!
//! A [`Terminal`] owns the state that would otherwise be process-global:
//! whether executions are live or faked, the fake registry and capture log,
//! and the table of registered builder extensions. Clones share that state,
//! so a context can be handed to the code under test while the test itself
//! keeps a handle for assertions. Separate contexts are fully isolated.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::builder::Builder;
use crate::command::CommandLine;
use crate::errors::Result;
use crate::fake::{CapturedCommand, FakeEntry, FakeState};
use crate::process::Process;
use crate::response::Response;

pub(crate) type ExtensionFn = dyn Fn(Builder) -> Builder + Send + Sync;

#[derive(Debug)]
enum Mode {
    Live,
    Faked(FakeState),
}

struct TerminalInner {
    mode: Mutex<Mode>,
    extensions: Mutex<HashMap<String, Arc<ExtensionFn>>>,
}

/// Execution context from which builders are created.
#[derive(Clone)]
pub struct Terminal {
    inner: Arc<TerminalInner>,
}

impl Terminal {
    /// A live context: builders spawn real processes.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TerminalInner {
                mode: Mutex::new(Mode::Live),
                extensions: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// A fresh builder bound to this context.
    pub fn builder(&self) -> Builder {
        Builder::new(self.clone())
    }

    /// Convenience for `builder().run(command)`.
    pub async fn run(&self, command: impl Into<CommandLine>) -> Result<Response> {
        self.builder().run(command).await
    }

    /// Register a builder extension under `name`, invocable through
    /// [`Builder::call`]. Re-registering a name replaces the previous
    /// extension.
    pub fn extend(
        &self,
        name: impl Into<String>,
        extension: impl Fn(Builder) -> Builder + Send + Sync + 'static,
    ) {
        self.inner
            .extensions
            .lock()
            .unwrap()
            .insert(name.into(), Arc::new(extension));
    }

    pub(crate) fn extension(&self, name: &str) -> Option<Arc<ExtensionFn>> {
        self.inner.extensions.lock().unwrap().get(name).cloned()
    }

    /// Switch this context into fake mode with an empty registry and a
    /// fresh capture log. Executions stop spawning real processes and
    /// answer from the registry instead; unregistered commands get an
    /// empty successful response. Calling this on an already faking
    /// context starts over from clean fake state.
    pub fn fake(&self) {
        *self.inner.mode.lock().unwrap() = Mode::Faked(FakeState::default());
    }

    /// Register a canned response for a command, switching into fake mode
    /// if needed. The command may be given in shell or argv form; both
    /// register under the same canonical rendering.
    pub fn fake_command(&self, command: impl Into<CommandLine>, entry: impl Into<FakeEntry>) {
        let rendered = command.into().render();
        let mut mode = self.inner.mode.lock().unwrap();
        if let Mode::Live = *mode {
            *mode = Mode::Faked(FakeState::default());
        }
        if let Mode::Faked(state) = &mut *mode {
            state.registry.insert(rendered, entry.into());
        }
    }

    /// Enter fake mode and register several canned responses at once,
    /// replacing whatever fake state the context held before.
    pub fn fake_with<C, E>(&self, entries: impl IntoIterator<Item = (C, E)>)
    where
        C: Into<CommandLine>,
        E: Into<FakeEntry>,
    {
        self.fake();
        for (command, entry) in entries {
            self.fake_command(command, entry);
        }
    }

    /// True when this context answers executions from the fake registry.
    pub fn is_faking(&self) -> bool {
        matches!(*self.inner.mode.lock().unwrap(), Mode::Faked(_))
    }

    /// Return this context to live execution, discarding the fake registry
    /// and the capture log.
    pub fn reset(&self) {
        *self.inner.mode.lock().unwrap() = Mode::Live;
    }

    /// Snapshot of every captured execution, oldest first. Empty for a
    /// live context.
    pub fn captured(&self) -> Vec<CapturedCommand> {
        match &*self.inner.mode.lock().unwrap() {
            Mode::Live => Vec::new(),
            Mode::Faked(state) => state.captured.clone(),
        }
    }

    /// Assert that `command` was executed exactly `times` times. Live
    /// contexts capture nothing, so they count zero.
    ///
    /// # Panics
    ///
    /// Panics with the observed count when the expectation does not hold.
    pub fn assert_executed(&self, command: impl Into<CommandLine>, times: usize) {
        let rendered = command.into().render();
        let count = match &*self.inner.mode.lock().unwrap() {
            Mode::Live => 0,
            Mode::Faked(state) => state.count_rendered(&rendered),
        };
        assert!(
            count == times,
            "The command `{rendered}` was executed {count} times instead of the expected {times} times."
        );
    }

    /// Assert that `command` was never executed.
    pub fn assert_not_executed(&self, command: impl Into<CommandLine>) {
        self.assert_executed(command, 0);
    }

    /// Assert that executions matching `pred` happened exactly `times`
    /// times. The predicate sees the full captured builder configuration.
    ///
    /// # Panics
    ///
    /// Panics with the observed count when the expectation does not hold.
    pub fn assert_executed_matching(
        &self,
        pred: impl Fn(&CapturedCommand) -> bool,
        times: usize,
    ) {
        let count = match &*self.inner.mode.lock().unwrap() {
            Mode::Live => 0,
            Mode::Faked(state) => state.count_matching(&pred),
        };
        assert!(
            count == times,
            "The matching command was executed {count} times instead of the expected {times} times."
        );
    }

    /// Fake-mode interception point for builder executions. Returns the
    /// canned response and records the capture, or `None` for a live
    /// context.
    pub(crate) fn intercept(&self, builder: &Builder) -> Option<Response> {
        let mut mode = self.inner.mode.lock().unwrap();
        let state = match &mut *mode {
            Mode::Live => return None,
            Mode::Faked(state) => state,
        };

        let captured = builder.capture();
        let rendered = captured.rendered.clone();
        let command = captured.command.clone();
        state.captured.push(captured);

        let response = match state.registry.get(&rendered) {
            Some(entry) => entry.respond(&command),
            None => Response::new(Process::completed(command, Vec::new(), 0)),
        };
        debug!(command = %rendered, "faked command execution");
        Some(response)
    }
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Terminal")
            .field("faking", &self.is_faking())
            .finish_non_exhaustive()
    }
}
