//! Test utilities for vcsync
//!
//! Available to unit tests and, through the `test-utils` feature, to the
//! integration suite.
//!
//! - [`init_test_logging`] installs a test-writer subscriber once
//! - [`TestGit`] arranges and inspects git repositories
//! - [`RemoteFixture`] provides a bare upstream with a pushing seed clone
//!
//! ```rust,no_run
//! use vcsync::test_utils::{RemoteFixture, init_test_logging};
//!
//! init_test_logging(None);
//! let remote = RemoteFixture::new().unwrap();
//! let sha = remote.push_commit("src/lib.rs", "// lib\n", "Add lib").unwrap();
//! assert_eq!(sha.len(), 40);
//! ```

pub mod fixtures;
pub mod git_helper;

pub use fixtures::{README, RemoteFixture};
pub use git_helper::TestGit;

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`; without either nothing is
/// installed. Safe to call from every test.
///
/// ```bash
/// RUST_LOG=vcsync=debug,run=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// Whether `bin` can be spawned, for skipping hg and svn tests.
pub fn has_binary(bin: &str) -> bool {
    crate::utils::platform::command_exists(bin)
}
