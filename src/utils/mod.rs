//! Cross-platform utilities
//!
//! - [`platform`] - binary discovery and path expansion
//! - [`progress`] - spinners for long-running synchronization

pub mod platform;
pub mod progress;

pub use platform::{command_exists, get_home_dir, is_windows, require_binary, resolve_path};
pub use progress::{MultiProgress, ProgressBar};
