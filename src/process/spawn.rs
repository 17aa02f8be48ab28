// src/process/spawn.rs

//! Child spawning and the output pump.
//!
//! `launch` builds the `tokio::process::Command` from a frozen spec and
//! spawns it; `drive` pumps stdout/stderr line by line into the shared
//! handle state (and the optional sink) while enforcing the overall and
//! idle timeouts, then records the exit status and wakes waiters.

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, Command};
use tokio::time::{Instant, sleep_until, timeout_at};
use tracing::{debug, warn};

use super::{ProcessInner, ProcessSpec};
use crate::command::CommandLine;
use crate::errors::{Result, TermrunError};
use crate::output::{OutputLine, OutputSink, StreamTag};

pub(super) struct Launched {
    child: Child,
    spec: ProcessSpec,
}

/// Spawn the child described by the handle's spec. Marks the handle as
/// started and records the pid; a handle can only be launched once.
pub(super) fn launch(inner: &Arc<ProcessInner>) -> Result<Launched> {
    let spec = inner.spec.lock().unwrap().clone();
    let mut cmd = build_command(&spec)?;

    let mut state = inner.state.lock().unwrap();
    if state.started {
        return Err(TermrunError::InvalidConfiguration(
            "process already started".to_string(),
        ));
    }
    let child = cmd.spawn().map_err(|source| TermrunError::ProcessStart {
        command: spec.command.render(),
        source,
    })?;
    state.started = true;
    state.pid = child.id();
    debug!(command = %spec.command, pid = ?child.id(), "spawned process");

    Ok(Launched { child, spec })
}

fn build_command(spec: &ProcessSpec) -> Result<Command> {
    // Shell lines go through the platform shell; argv forms are spawned
    // directly.
    let mut cmd = match &spec.command {
        CommandLine::Shell(line) => {
            if cfg!(windows) {
                let mut c = Command::new("cmd");
                c.arg("/C").arg(line);
                c
            } else {
                let mut c = Command::new("sh");
                c.arg("-c").arg(line);
                c
            }
        }
        CommandLine::Argv(argv) => {
            let (program, args) = argv.split_first().ok_or_else(|| {
                TermrunError::InvalidConfiguration("cannot execute an empty command".to_string())
            })?;
            let mut c = Command::new(program);
            c.args(args);
            c
        }
    };

    if spec.env_clear {
        cmd.env_clear();
    }
    cmd.envs(&spec.env);
    if let Some(dir) = &spec.cwd {
        cmd.current_dir(dir);
    }

    if spec.tty {
        // TTY mode hands the parent terminal to the child; output is not
        // captured in that case.
        cmd.stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
    } else {
        let stdin = if spec.input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        };
        cmd.stdin(stdin).stdout(Stdio::piped()).stderr(Stdio::piped());
    }
    cmd.kill_on_drop(true);

    Ok(cmd)
}

/// Pump the child's output into the handle state until it exits or a
/// timeout kills it.
pub(super) async fn drive(inner: Arc<ProcessInner>, launched: Launched, sink: Option<OutputSink>) {
    let Launched { mut child, mut spec } = launched;

    // Feed input from a detached task so a child that fills its output
    // pipes before reading stdin cannot deadlock the pump.
    if let Some(bytes) = spec.input.take() {
        if let Some(mut stdin) = child.stdin.take() {
            tokio::spawn(async move {
                if let Err(err) = stdin.write_all(&bytes).await {
                    debug!(error = %err, "process closed stdin before input was written");
                }
            });
        }
    }

    let mut stdout = child.stdout.take().map(|s| BufReader::new(s).lines());
    let mut stderr = child.stderr.take().map(|s| BufReader::new(s).lines());

    let deadline = spec.timeout.map(|t| Instant::now() + t);
    let mut idle_deadline = spec.idle_timeout.map(|t| Instant::now() + t);
    let mut killed = false;

    while stdout.is_some() || stderr.is_some() {
        tokio::select! {
            line = next_line(&mut stdout) => match line {
                Some(text) => {
                    if let Some(idle) = spec.idle_timeout {
                        idle_deadline = Some(Instant::now() + idle);
                    }
                    record(&inner, &sink, StreamTag::Stdout, text);
                }
                None => stdout = None,
            },
            line = next_line(&mut stderr) => match line {
                Some(text) => {
                    if let Some(idle) = spec.idle_timeout {
                        idle_deadline = Some(Instant::now() + idle);
                    }
                    record(&inner, &sink, StreamTag::Stderr, text);
                }
                None => stderr = None,
            },
            _ = sleep_until(deadline.unwrap_or_else(far_future)), if deadline.is_some() => {
                kill_timed_out(&inner, &mut child, "timeout").await;
                killed = true;
                break;
            }
            _ = sleep_until(idle_deadline.unwrap_or_else(far_future)), if idle_deadline.is_some() => {
                kill_timed_out(&inner, &mut child, "idle timeout").await;
                killed = true;
                break;
            }
        }
    }

    // The streams are closed (or the child was killed); the overall and
    // idle deadlines still bound the final wait, for a child that closed
    // its pipes but keeps running. The idle deadline carries over from the
    // last line read, so a silent post-EOF child counts as stalled.
    let wait_bound = match (deadline, idle_deadline) {
        (Some(overall), Some(idle)) => Some(overall.min(idle)),
        (overall, idle) => overall.or(idle),
    };
    let status = if killed {
        child.wait().await
    } else {
        match wait_bound {
            Some(bound) => match timeout_at(bound, child.wait()).await {
                Ok(status) => status,
                Err(_) => {
                    let reason = if deadline == Some(bound) {
                        "timeout"
                    } else {
                        "idle timeout"
                    };
                    kill_timed_out(&inner, &mut child, reason).await;
                    child.wait().await
                }
            },
            None => child.wait().await,
        }
    };

    let exit_code = match status {
        Ok(status) => status.code(),
        Err(err) => {
            warn!(error = %err, "failed to wait for process");
            None
        }
    };

    let mut state = inner.state.lock().unwrap();
    state.exit_code = exit_code;
    state.finished = true;
    let timed_out = state.timed_out;
    drop(state);

    debug!(exit_code = ?exit_code, timed_out, "process exited");
    inner.done.notify_waiters();
}

async fn next_line<R>(lines: &mut Option<Lines<BufReader<R>>>) -> Option<String>
where
    R: AsyncRead + Unpin,
{
    match lines {
        // Read errors end the stream the same way EOF does.
        Some(lines) => lines.next_line().await.ok().flatten(),
        None => std::future::pending().await,
    }
}

fn record(inner: &Arc<ProcessInner>, sink: &Option<OutputSink>, tag: StreamTag, text: String) {
    debug!(stream = %tag, "{text}");
    if let Some(sink) = sink {
        sink.emit(tag, &text);
    }
    let mut state = inner.state.lock().unwrap();
    state.lines.push(OutputLine::new(tag, text));
}

async fn kill_timed_out(inner: &Arc<ProcessInner>, child: &mut Child, reason: &str) {
    warn!(reason, pid = ?child.id(), "killing process");
    if let Err(err) = child.kill().await {
        warn!(error = %err, "failed to kill timed out process");
    }
    inner.state.lock().unwrap().timed_out = true;
}

fn far_future() -> Instant {
    // Effectively "never" for deadline arms that are disabled.
    Instant::now() + Duration::from_secs(86400 * 365 * 30)
}
