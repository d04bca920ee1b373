//! Single-command process execution with output capture, timeout, and
//! cancellation.
//!
//! The executor runs one [`CommandDefinition`] to completion: ambient
//! environment overlaid with the definition's entries, stdin written in full
//! then closed (or closed immediately when absent), stdout and stderr drained
//! on reader threads so the child can never block on a full pipe. A deadline
//! or a caller-initiated [`CancelToken`] terminates the child with a graceful
//! signal first and a forced kill after a bounded grace window.

use std::io::{self, Read, Write};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::spec::{CommandDefinition, Verb};

/// Poll interval while waiting for the child to exit.
const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Grace window between the termination signal and a forced kill.
const KILL_GRACE: Duration = Duration::from_secs(2);

/// Shared flag that aborts an in-flight execution.
///
/// Clones share the same flag, so a host can hand one clone to the controller
/// and trip another from its interrupt handler.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a fresh, untripped token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request termination of any execution holding a clone of this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Outcome of running one command definition to completion.
///
/// A non-zero exit is a normal result here; whether it is fatal depends on
/// the verb and is decided by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Captured standard output, in full
    pub stdout: String,
    /// Captured standard error, in full
    pub stderr: String,
    /// Exit code; -1 when the process died to a signal
    pub exit_code: i32,
}

impl ExecutionResult {
    /// Whether the process exited zero.
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Run a command definition to completion and capture its output.
///
/// Fails with [`Error::ProcessStart`] when the executable cannot be spawned,
/// [`Error::Timeout`] when the definition's deadline expires, and
/// [`Error::Cancelled`] when the token trips; in the latter two cases the
/// child is terminated before the call returns. A non-zero exit is returned
/// as a normal [`ExecutionResult`].
pub fn execute(verb: Verb, def: &CommandDefinition, cancel: &CancelToken) -> Result<ExecutionResult> {
    let program = def.program().ok_or_else(|| Error::Validation {
        verb,
        message: "command vector is empty".into(),
    })?;

    let mut command = Command::new(program);
    command.args(&def.command[1..]);
    if let Some(environment) = &def.environment {
        command.envs(environment);
    }
    command.stdin(if def.stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());

    log::debug!("spawning {verb} command: {:?}", def.command);
    let mut child = command.spawn().map_err(|source| Error::ProcessStart {
        verb,
        program: program.to_string(),
        source,
    })?;

    // Drain both output pipes off-thread before writing stdin, so a child
    // that produces output while reading its input cannot deadlock.
    let stdout_reader = spawn_reader(child.stdout.take());
    let stderr_reader = spawn_reader(child.stderr.take());

    if let Some(payload) = def.stdin.as_deref() {
        if let Some(mut stdin) = child.stdin.take() {
            match stdin.write_all(payload.as_bytes()) {
                Ok(()) => {}
                // The child may legitimately exit without reading its input.
                Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {}
                Err(source) => {
                    terminate(&mut child);
                    return Err(Error::Io { verb, source });
                }
            }
            // stdin drops here, closing the pipe.
        }
    }

    let status = wait_with_deadline(verb, &mut child, def.timeout_secs, cancel)?;

    let stdout = join_reader(stdout_reader);
    let stderr = join_reader(stderr_reader);
    let exit_code = status.code().unwrap_or(-1);
    log::debug!("{verb} command exited with code {exit_code}");

    Ok(ExecutionResult {
        stdout,
        stderr,
        exit_code,
    })
}

fn spawn_reader<R: Read + Send + 'static>(source: Option<R>) -> Option<JoinHandle<String>> {
    source.map(|mut stream| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = stream.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    })
}

fn join_reader(handle: Option<JoinHandle<String>>) -> String {
    handle
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default()
}

/// Poll the child until exit, deadline expiry, or cancellation.
fn wait_with_deadline(
    verb: Verb,
    child: &mut Child,
    timeout_secs: Option<u64>,
    cancel: &CancelToken,
) -> Result<ExitStatus> {
    let start = Instant::now();
    let deadline = timeout_secs.map(Duration::from_secs);

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {}
            Err(source) => return Err(Error::Io { verb, source }),
        }

        if cancel.is_cancelled() {
            log::warn!("{verb} command cancelled, terminating");
            terminate(child);
            return Err(Error::Cancelled { verb });
        }

        if let Some(limit) = deadline {
            if start.elapsed() >= limit {
                log::warn!(
                    "{verb} command exceeded {}s deadline, terminating",
                    timeout_secs.unwrap_or_default()
                );
                terminate(child);
                return Err(Error::Timeout {
                    verb,
                    timeout_secs: timeout_secs.unwrap_or_default(),
                });
            }
        }

        thread::sleep(POLL_INTERVAL);
    }
}

/// Terminate the child: graceful signal first, forced kill after the grace
/// window.
#[cfg(unix)]
fn terminate(child: &mut Child) {
    let pid = child.id() as libc::pid_t;
    // SAFETY: kill(2) with a pid we own and a constant signal number.
    unsafe {
        libc::kill(pid, libc::SIGTERM);
    }

    let start = Instant::now();
    while start.elapsed() < KILL_GRACE {
        if matches!(child.try_wait(), Ok(Some(_))) {
            return;
        }
        thread::sleep(POLL_INTERVAL);
    }

    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}
