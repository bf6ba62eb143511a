//! Core types for vcsync
//!
//! The core module holds the error taxonomy shared by every other module:
//! - [`CommandError`] - Output, exit code and command line of a failed subprocess
//! - [`VcsError`] - Enumerated error type for all library failures
//! - [`ErrorContext`] - User-friendly error wrapper with suggestions and details
//! - [`user_friendly_error`] - Convert any error to the user-friendly format
//!
//! Library functions return [`Result`], an alias over [`VcsError`]. The CLI
//! layer works with [`anyhow::Result`] and converts at the edge with
//! [`user_friendly_error`].

pub mod error;

pub use error::{CommandError, ErrorContext, Result, VcsError, user_friendly_error};
