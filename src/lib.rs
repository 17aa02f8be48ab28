// src/lib.rs

//! Fluent interface for executing external processes.
//!
//! Commands are configured through a chainable [`Builder`] obtained from a
//! [`Terminal`] context, executed on tokio, and observed through
//! [`Response`] views over the underlying [`Process`] handle.
//!
//! - Shell commands may embed `{{ $name }}` placeholders; bound values
//!   travel through the child environment instead of being interpolated,
//!   so they cannot alter the command structure.
//! - Failed executions can be retried a bounded number of times with a
//!   pause between attempts.
//! - A context can be switched into fake mode for tests: executions are
//!   captured and answered from a registry of canned responses, with
//!   assertion helpers over the capture log.
//!
//! ```no_run
//! use termrun::Terminal;
//!
//! # #[tokio::main]
//! # async fn main() -> termrun::Result<()> {
//! let terminal = Terminal::new();
//! let response = terminal
//!     .builder()
//!     .with("name", "World")
//!     .run("echo Hello, {{ $name }}")
//!     .await?;
//! assert!(response.successful());
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod command;
pub mod errors;
pub mod fake;
pub mod output;
pub mod process;
pub mod response;
mod template;
pub mod terminal;

pub use builder::{Builder, DEFAULT_TIMEOUT, RetryPolicy};
pub use command::CommandLine;
pub use errors::{Result, TermrunError};
pub use fake::{CapturedCommand, FakeEntry, FakeResponse};
pub use output::{ConsoleCommand, OutputLine, OutputSink, StreamTag};
pub use process::Process;
pub use response::Response;
pub use terminal::Terminal;
