//! Constants shared across the crate.
//!
//! Chunk sizes, polling intervals, fallback refs and default configuration
//! values live here so that the runner, the synchronizers and the CLI agree
//! on them.

use std::time::Duration;

/// Size of each stderr chunk delivered to a progress callback (128 bytes).
///
/// Every chunk except possibly the last one of a stream is exactly this long.
pub const PROGRESS_CHUNK_SIZE: usize = 128;

/// Sentinel passed to a progress callback once the child process has exited.
pub const END_OF_STREAM: &str = "\r";

/// How often the blocking runner polls a child process for exit (10ms).
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Commands slower than this are logged under the `run::perf` target.
pub const SLOW_COMMAND_THRESHOLD: Duration = Duration::from_secs(1);

/// Output recorded for a command that was killed after its timeout.
pub const TIMEOUT_MESSAGE: &str = "Command timed out";

/// Ref used by the git synchronizer when HEAD is not a symbolic ref.
pub const FALLBACK_GIT_REF: &str = "origin/master";

/// Revision reported for a git repository without any commit.
pub const INITIAL_REVISION: &str = "initial";

/// Name of the remote every git handle must carry.
pub const ORIGIN: &str = "origin";

/// Default number of repositories synchronized concurrently by the CLI.
///
/// Synchronization is network bound, so the default is independent of the
/// CPU count.
pub const DEFAULT_MAX_PARALLEL: usize = 4;

/// Environment variable overriding the configuration file location.
pub const CONFIG_ENV_VAR: &str = "VCSYNC_CONFIG";

/// Environment variable that disables progress spinners when set.
pub const NO_PROGRESS_ENV_VAR: &str = "VCSYNC_NO_PROGRESS";
