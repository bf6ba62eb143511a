//! Subprocess execution with progress streaming
//!
//! This module is the command execution primitive every synchronizer is
//! built on. A [`CommandRequest`] describes one invocation (argument vector,
//! working directory, environment, stdin payload, exit code policy, timeout)
//! and is executed by one of two behaviorally equivalent runners:
//!
//! - [`run`] / [`run_with_output`] block the calling thread, polling the child
//!   while a reader thread streams stderr
//! - [`async_run`] / [`async_run_with_output`] run on tokio, draining stdout
//!   and streaming stderr concurrently
//!
//! # Output selection
//!
//! Stdout and stderr are captured on separate pipes. When the child exits
//! with code 0 the result is stdout, otherwise stderr. In both cases each
//! line is trimmed, empty lines are dropped and the remaining lines are
//! joined with `\n`.
//!
//! # Progress callbacks
//!
//! When a callback is supplied, stderr is read in chunks of
//! [`PROGRESS_CHUNK_SIZE`](crate::constants::PROGRESS_CHUNK_SIZE) bytes while
//! the child is alive and each nonempty chunk is passed to the callback with a
//! wall-clock timestamp. A chunk may end in the middle of a line; git writes
//! its progress as partial lines terminated by `\r`, so consumers must not
//! assume line boundaries. After the child exits the callback receives the
//! sentinel `"\r"` exactly once.
//!
//! If the request sets `log_in_real_time` and no callback is supplied, chunks
//! are echoed to standard output.
//!
//! # Examples
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use vcsync::run::{run, CommandRequest, ProgressCallback};
//!
//! let progress: ProgressCallback = Arc::new(|chunk: &str, _timestamp| eprint!("{chunk}"));
//! let request = CommandRequest::new("git")
//!     .args(["clone", "--progress", "https://github.com/vcs-python/libvcs", "libvcs"])
//!     .log_in_real_time(true);
//! run(&request, Some(&progress))?;
//! # Ok::<(), vcsync::core::VcsError>(())
//! ```

mod asynchronous;
mod blocking;
pub mod executor;

pub use asynchronous::{async_run, async_run_with_output};
pub use blocking::{run, run_with_output};
pub use executor::{BlockingExecutor, Executor, TokioExecutor};

use chrono::{DateTime, Local};
use futures::future::BoxFuture;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::constants::SLOW_COMMAND_THRESHOLD;
use crate::core::{CommandError, Result, VcsError};

/// Synchronous progress callback: receives an output chunk and a timestamp.
pub type ProgressCallback = Arc<dyn Fn(&str, DateTime<Local>) + Send + Sync>;

/// Asynchronous progress callback, awaited by [`async_run`] for each chunk.
pub type AsyncProgressCallback =
    Arc<dyn Fn(String, DateTime<Local>) -> BoxFuture<'static, ()> + Send + Sync>;

/// Adapt a synchronous callback for use with the async runner.
#[must_use]
pub fn wrap_sync_callback(callback: ProgressCallback) -> AsyncProgressCallback {
    Arc::new(move |chunk: String, timestamp: DateTime<Local>| {
        callback(&chunk, timestamp);
        Box::pin(futures::future::ready(())) as BoxFuture<'static, ()>
    })
}

/// Callback used when `log_in_real_time` is requested without a callback.
#[must_use]
pub fn stdout_callback() -> ProgressCallback {
    Arc::new(|chunk: &str, _timestamp: DateTime<Local>| {
        let mut stdout = std::io::stdout().lock();
        let _ = stdout.write_all(chunk.as_bytes());
        let _ = stdout.flush();
    })
}

/// Description of a single subprocess invocation.
///
/// Built with a fluent API and consumed by the runners. Defaults:
/// - `check_returncode`: `true`
/// - `timeout`: none
/// - `log_in_real_time`: `false`
/// - working directory and environment inherited from the current process
///
/// ```rust
/// use std::time::Duration;
/// use vcsync::run::CommandRequest;
///
/// let request = CommandRequest::new("git")
///     .args(["show-ref", "main"])
///     .current_dir("/tmp/repo")
///     .env("LC_ALL", "C")
///     .check_returncode(false)
///     .timeout(Duration::from_secs(30));
/// assert_eq!(request.render(), "git show-ref main");
/// ```
#[derive(Debug, Clone)]
pub struct CommandRequest {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    env: Vec<(String, String)>,
    input: Option<Vec<u8>>,
    check_returncode: bool,
    timeout: Option<Duration>,
    log_in_real_time: bool,
}

impl CommandRequest {
    /// Start a request for `program` with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
            input: None,
            check_returncode: true,
            timeout: None,
            log_in_real_time: false,
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run the command from `dir`. The directory must exist.
    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Set an environment variable for the child only.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Bytes written to the child's stdin before it is closed.
    pub fn input(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.input = Some(input.into());
        self
    }

    /// Whether a nonzero exit code is turned into [`VcsError::CommandFailed`].
    pub const fn check_returncode(mut self, check: bool) -> Self {
        self.check_returncode = check;
        self
    }

    /// Kill the child and fail with [`VcsError::CommandTimeout`] after `duration`.
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Set or clear the timeout.
    pub const fn with_timeout(mut self, duration: Option<Duration>) -> Self {
        self.timeout = duration;
        self
    }

    /// Mark the command as one whose stderr progress should be streamed.
    pub const fn log_in_real_time(mut self, enabled: bool) -> Self {
        self.log_in_real_time = enabled;
        self
    }

    /// Program name.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments after the program name.
    #[must_use]
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Working directory, if one was set.
    #[must_use]
    pub fn get_current_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    #[must_use]
    pub const fn checks_returncode(&self) -> bool {
        self.check_returncode
    }

    #[must_use]
    pub const fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    #[must_use]
    pub const fn is_log_in_real_time(&self) -> bool {
        self.log_in_real_time
    }

    /// Space-joined argument vector, used in logs and error messages.
    #[must_use]
    pub fn render(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Exit code, selected output and command line of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code; `-1` when the child was terminated by a signal
    pub returncode: i32,
    /// Normalized stdout on success, normalized stderr otherwise
    pub output: String,
    /// Space-joined argument vector
    pub cmd: String,
}

impl CommandOutput {
    #[must_use]
    pub const fn success(&self) -> bool {
        self.returncode == 0
    }

    /// Apply the request's exit code policy.
    pub(crate) fn into_result(self, check_returncode: bool) -> Result<String> {
        if self.returncode != 0 && check_returncode {
            return Err(VcsError::CommandFailed(CommandError::new(
                self.output,
                self.returncode,
                self.cmd,
            )));
        }
        Ok(self.output)
    }
}

/// Trim every line, drop empty ones and join the rest with `\n`.
#[must_use]
pub fn normalize_output(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

pub(crate) fn select_output(returncode: i32, stdout: &[u8], stderr: &[u8]) -> String {
    if returncode == 0 {
        normalize_output(stdout)
    } else {
        normalize_output(stderr)
    }
}

/// Incremental UTF-8 decoder for stderr chunks.
///
/// A multi-byte character split across two chunks is held back and emitted
/// with the next chunk. Invalid sequences are replaced with U+FFFD.
#[derive(Debug, Default)]
pub(crate) struct ChunkDecoder {
    pending: Vec<u8>,
}

impl ChunkDecoder {
    pub(crate) fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        match std::str::from_utf8(&self.pending) {
            Ok(text) => {
                let text = text.to_owned();
                self.pending.clear();
                text
            }
            // Incomplete trailing sequence: keep it for the next chunk
            Err(e) if e.error_len().is_none() => {
                let valid = e.valid_up_to();
                let text = String::from_utf8_lossy(&self.pending[..valid]).into_owned();
                self.pending.drain(..valid);
                text
            }
            Err(_) => {
                let text = String::from_utf8_lossy(&self.pending).into_owned();
                self.pending.clear();
                text
            }
        }
    }

    pub(crate) fn finish(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        text
    }
}

pub(crate) fn exit_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

pub(crate) fn timeout_error(cmd: String, timeout: Duration) -> VcsError {
    VcsError::CommandTimeout(CommandError::new(
        format!("{} after {:.2}s", crate::constants::TIMEOUT_MESSAGE, timeout.as_secs_f64()),
        -1,
        cmd,
    ))
}

pub(crate) fn log_completion(output: &CommandOutput, started: Instant) {
    let elapsed = started.elapsed();
    tracing::debug!(
        target: "run",
        "Command exited with code {} after {}ms: {}",
        output.returncode,
        elapsed.as_millis(),
        output.cmd
    );
    if !output.output.is_empty() {
        tracing::trace!(target: "run", "{}", output.output);
    }
    if elapsed > SLOW_COMMAND_THRESHOLD {
        tracing::info!(target: "run::perf", "{} took {:.2}s", output.cmd, elapsed.as_secs_f64());
    }
}
