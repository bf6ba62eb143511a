//! Platform-specific helpers
//!
//! Binary discovery and path expansion used by the synchronizers and the
//! configuration loader. Everything here behaves the same on Windows, macOS
//! and Linux apart from the executable suffix returned by [`vcs_command`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use vcsync::utils::platform::{command_exists, resolve_path};
//!
//! # fn example() -> anyhow::Result<()> {
//! let checkout = resolve_path("~/code/libvcs")?;
//! if command_exists("git") {
//!     println!("syncing into {}", checkout.display());
//! }
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::core::VcsError;

/// Checks if the current platform is Windows.
#[must_use]
pub const fn is_windows() -> bool {
    cfg!(windows)
}

/// Gets the home directory path for the current user.
///
/// # Errors
///
/// Fails when neither `HOME` (Unix) nor `USERPROFILE` (Windows) resolves.
pub fn get_home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| {
        let platform_help = if is_windows() {
            "On Windows: Check that the USERPROFILE environment variable is set"
        } else {
            "On Unix/Linux: Check that the HOME environment variable is set"
        };
        anyhow::anyhow!("Could not determine home directory.\n\n{platform_help}")
    })
}

/// Executable name for a VCS binary on the current platform.
///
/// Returns `"git.exe"` for `"git"` on Windows and `"git"` elsewhere. The
/// binary still has to be on `PATH` for commands to succeed.
#[must_use]
pub fn vcs_command(bin: &str) -> String {
    if is_windows() && !bin.ends_with(".exe") {
        format!("{bin}.exe")
    } else {
        bin.to_string()
    }
}

/// Expands `~` and environment variables (`$VAR`, `${VAR}`) in `path`.
///
/// ```rust,no_run
/// use vcsync::utils::platform::resolve_path;
///
/// # fn example() -> anyhow::Result<()> {
/// let path = resolve_path("$HOME/code/libvcs")?;
/// assert!(path.is_absolute());
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Fails on references to undefined environment variables.
pub fn resolve_path(path: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(path)
        .with_context(|| format!("Failed to expand path: {path}"))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

/// Whether `cmd` resolves to an executable on `PATH`.
#[must_use]
pub fn command_exists(cmd: &str) -> bool {
    which::which(cmd).is_ok()
}

/// Full path of a required VCS binary.
///
/// # Errors
///
/// Returns [`VcsError::BinaryNotFound`] when the binary is not on `PATH`.
pub fn require_binary(bin: &str) -> crate::core::Result<PathBuf> {
    which::which(vcs_command(bin)).map_err(|_| VcsError::BinaryNotFound {
        bin: bin.to_string(),
    })
}
