//! vcsync - typed synchronization of version-controlled working copies
//!
//! vcsync drives the `git`, `hg` and `svn` command-line programs to clone
//! missing working copies and bring existing ones up to date. For git it
//! stashes local changes, rebases them onto the fetched upstream and restores
//! them, recovering instead of failing when one of those steps goes wrong.
//!
//! # Architecture Overview
//!
//! - [`run`] spawns one VCS invocation, streaming its stderr progress to a
//!   callback in 128-byte chunks, blocking or on tokio
//! - [`cmd`] builds the invocations (`git fetch`, `hg pull`, `svn update`, ...)
//! - [`sync`] holds the per-VCS handles and their workflows, plus the
//!   polymorphic [`Project`](sync::Project) built by a registry
//! - [`url`] detects the VCS of a url and splits `vcs+url@rev` locations
//! - [`config`] and [`cli`] make up the `vcsync` binary
//!
//! # Example
//!
//! ```rust,no_run
//! use vcsync::sync::git::GitSync;
//!
//! # fn example() -> vcsync::core::Result<()> {
//! let repo = GitSync::builder("git+https://github.com/vcs-python/libvcs", "/tmp/libvcs")
//!     .rev("master")
//!     .build()?;
//! println!("{}", repo.update_repo(false)?);
//! # Ok(())
//! # }
//! ```
//!
//! # Platform Support
//!
//! Binaries are looked up on `PATH` (`git.exe` etc. on Windows). Paths in the
//! configuration expand `~` and environment variables.

pub mod cli;
pub mod cmd;
pub mod config;
pub mod constants;
pub mod core;
pub mod run;
pub mod sync;
pub mod url;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
