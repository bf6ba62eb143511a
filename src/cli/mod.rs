//! Command-line interface for vcsync
//!
//! # Commands
//!
//! - `sync [PATTERN..]` - update the configured repositories concurrently
//! - `status <PATH>` - ahead/behind state of a git working copy
//! - `revision <PATH>` - current revision of any working copy
//! - `list` - the configured repositories
//!
//! # Global Options
//!
//! - `--verbose` / `-v`: debug logging
//! - `--quiet` / `-q`: errors only
//! - `--config` / `-c`: configuration file (also `VCSYNC_CONFIG`)
//! - `--no-progress`: hide spinners
//!
//! ```bash
//! vcsync sync                    # every configured repository
//! vcsync sync 'lib*' --set-remotes
//! vcsync status ~/code/libvcs --format json
//! ```

mod list;
mod revision;
mod status;
mod sync;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use crate::constants::CONFIG_ENV_VAR;
use crate::sync::{AsyncProject, ProjectOptions, ProjectRegistry, VcsKind};

/// Settings shared by every subcommand.
///
/// Passed explicitly instead of being exported to the process environment,
/// so tests can drive commands side by side.
#[derive(Debug, Clone, Default)]
pub struct CliContext {
    pub config_path: Option<PathBuf>,
    pub no_progress: bool,
    pub quiet: bool,
}

/// Output format of the reporting commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    name = "vcsync",
    about = "Keep git, Mercurial and Subversion working copies in sync",
    version,
    long_about = "vcsync clones missing working copies and updates existing ones, \
                  stashing and rebasing local git changes onto their upstream."
)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Path to the configuration file [default: ~/.vcsync/config.toml]
    #[arg(short, long, global = true, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Disable progress spinners
    #[arg(long, global = true)]
    no_progress: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Clone or update configured repositories
    Sync(sync::SyncCommand),
    /// Show the branch state of a git working copy
    Status(status::StatusCommand),
    /// Print the current revision of a working copy
    Revision(revision::RevisionCommand),
    /// List configured repositories
    List(list::ListCommand),
}

impl Cli {
    /// Default log filter implied by `--verbose` and `--quiet`.
    ///
    /// `None` leaves the choice to `RUST_LOG`.
    #[must_use]
    pub const fn log_level(&self) -> Option<&'static str> {
        if self.verbose {
            Some("debug")
        } else if self.quiet {
            Some("error")
        } else {
            None
        }
    }

    #[must_use]
    pub fn context(&self) -> CliContext {
        CliContext {
            config_path: self.config.clone(),
            no_progress: self.no_progress,
            quiet: self.quiet,
        }
    }

    pub async fn execute(self) -> Result<()> {
        let ctx = self.context();
        self.execute_with_context(&ctx).await
    }

    pub async fn execute_with_context(self, ctx: &CliContext) -> Result<()> {
        match self.command {
            Commands::Sync(cmd) => cmd.execute(ctx).await,
            Commands::Status(cmd) => cmd.execute(ctx).await,
            Commands::Revision(cmd) => cmd.execute(ctx).await,
            Commands::List(cmd) => cmd.execute(ctx).await,
        }
    }
}

/// Open an existing working copy for local queries.
///
/// The handle's url is only used for cloning, so the path stands in for it.
fn open_working_copy(path: &Path) -> Result<AsyncProject> {
    let path = crate::utils::platform::resolve_path(&path.to_string_lossy())?;
    let Some(kind) = VcsKind::detect_working_copy(&path) else {
        anyhow::bail!("{} is not a git, hg or svn working copy", path.display());
    };
    crate::utils::platform::require_binary(kind.as_str())?;
    let options = ProjectOptions::new(path.display().to_string(), path);
    Ok(ProjectRegistry::default().create_async(options, Some(kind.as_str()))?)
}
