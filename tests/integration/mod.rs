//! Integration test suite for vcsync
//!
//! Exercises real git repositories created in temporary directories, so
//! these tests need `git` on `PATH`. Mercurial and Subversion tests skip
//! themselves when the binary is missing.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! - **run**: command runner against a real VCS binary
//! - **git_sync**: clone, fast-forward, revision pinning and recovery paths
//! - **remotes**: remote queries and reconciliation
//! - **concurrency**: many async synchronizers on one runtime
//! - **other_vcs**: hg and svn checkouts
//! - **cli**: the `vcsync` binary

#[path = "../common/mod.rs"]
mod common;

mod cli;
mod concurrency;
mod git_sync;
mod other_vcs;
mod remotes;
mod run;
