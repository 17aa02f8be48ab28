// src/output.rs

//! Captured output lines and live output sinks.
//!
//! - [`OutputLine`]: one line of child output tagged with its source stream,
//!   the unit stored by process handles and canned fake responses.
//! - [`OutputSink`]: a shared callback invoked with `(tag, chunk)` for every
//!   line a process emits, with adapters for plain writers and for console
//!   commands that expose a writer.

use std::any::Any;
use std::fmt;
use std::io::Write;
use std::sync::{Arc, Mutex};

use crate::errors::{Result, TermrunError};

/// Source stream of an output chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamTag {
    Stdout,
    Stderr,
}

impl StreamTag {
    /// True for stderr.
    pub fn is_error(self) -> bool {
        matches!(self, StreamTag::Stderr)
    }
}

impl fmt::Display for StreamTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamTag::Stdout => f.write_str("stdout"),
            StreamTag::Stderr => f.write_str("stderr"),
        }
    }
}

/// One line of process output, without its trailing newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    tag: StreamTag,
    content: String,
}

impl OutputLine {
    pub fn new(tag: StreamTag, content: impl Into<String>) -> Self {
        Self {
            tag,
            content: content.into(),
        }
    }

    /// A stdout line.
    pub fn out(content: impl Into<String>) -> Self {
        Self::new(StreamTag::Stdout, content)
    }

    /// A stderr line.
    pub fn err(content: impl Into<String>) -> Self {
        Self::new(StreamTag::Stderr, content)
    }

    pub fn tag(&self) -> StreamTag {
        self.tag
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// True when the line came from stderr.
    pub fn is_error(&self) -> bool {
        self.tag.is_error()
    }

    /// True when the line came from stdout.
    pub fn ok(&self) -> bool {
        !self.is_error()
    }
}

impl fmt::Display for OutputLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.content)
    }
}

type ChunkFn = dyn FnMut(StreamTag, &str) + Send;

/// Destination for live process output.
///
/// Internally a shared callback, so cloning a sink (for example when a
/// builder is cloned, or when output is pumped from a background task)
/// forwards to the same destination.
#[derive(Clone)]
pub struct OutputSink {
    inner: Arc<Mutex<Box<ChunkFn>>>,
}

impl OutputSink {
    /// Sink invoking `f` with `(tag, line)` for every emitted line.
    pub fn callback(f: impl FnMut(StreamTag, &str) + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(f))),
        }
    }

    /// Sink writing each line, newline terminated, to `writer`. The stream
    /// tag is dropped; write errors are ignored.
    pub fn writer(writer: impl Write + Send + 'static) -> Self {
        let mut writer = writer;
        Self::callback(move |_tag, chunk| {
            let _ = writeln!(writer, "{chunk}");
        })
    }

    /// Sink forwarding each line to the writer exposed by a console command.
    pub fn console(command: impl ConsoleCommand + 'static) -> Self {
        Self::console_boxed(Box::new(command))
    }

    fn console_boxed(mut command: Box<dyn ConsoleCommand>) -> Self {
        Self::callback(move |_tag, chunk| {
            let _ = writeln!(command.writer(), "{chunk}");
        })
    }

    /// Accept a type-erased sink from a host framework.
    ///
    /// Supported shapes: an [`OutputSink`], a boxed writer
    /// (`Box<dyn Write + Send>`), or a boxed [`ConsoleCommand`]. Anything
    /// else is rejected with
    /// [`InvalidConfiguration`](TermrunError::InvalidConfiguration) before
    /// any process is spawned.
    pub fn from_any(value: Box<dyn Any + Send>) -> Result<Self> {
        let value = match value.downcast::<OutputSink>() {
            Ok(sink) => return Ok(*sink),
            Err(other) => other,
        };
        let value = match value.downcast::<Box<dyn Write + Send>>() {
            Ok(writer) => return Ok(Self::writer(*writer)),
            Err(other) => other,
        };
        match value.downcast::<Box<dyn ConsoleCommand>>() {
            Ok(command) => Ok(Self::console_boxed(*command)),
            Err(_) => Err(TermrunError::InvalidConfiguration(
                "invalid output type: expected a callback, a writer or a console command"
                    .to_string(),
            )),
        }
    }

    pub(crate) fn emit(&self, tag: StreamTag, chunk: &str) {
        let mut f = self.inner.lock().unwrap();
        f(tag, chunk);
    }
}

impl fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutputSink").finish_non_exhaustive()
    }
}

/// Host-framework console command that can receive forwarded output.
///
/// The one capability required is access to a writer; lines are written to
/// it newline terminated, in emission order.
pub trait ConsoleCommand: Send {
    fn writer(&mut self) -> &mut (dyn Write + Send);
}
