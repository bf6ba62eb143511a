//! Repository synchronizers
//!
//! A synchronizer binds a working copy path to a remote url and knows three
//! operations: `obtain` (first checkout), `update_repo` (converge on the
//! requested revision) and `get_revision`. Each VCS has a handle type in its
//! own module:
//!
//! - [`git`] - [`GitSync`](git::GitSync), the stash/rebase aware workflow
//! - [`hg`] - [`HgSync`](hg::HgSync)
//! - [`svn`] - [`SvnSync`](svn::SvnSync)
//!
//! [`Project`] and [`AsyncProject`] erase the VCS behind one enum, and
//! [`ProjectRegistry`] builds them from a url and an optional VCS name.
//!
//! ```rust,no_run
//! use vcsync::sync::{ProjectOptions, create_project};
//!
//! # fn example() -> vcsync::core::Result<()> {
//! let project = create_project(
//!     ProjectOptions::new("git+https://github.com/vcs-python/libvcs", "/tmp/libvcs"),
//!     None,
//! )?;
//! let outcome = project.update_repo(false)?;
//! println!("{}: {outcome}", project.repo_name());
//! # Ok(())
//! # }
//! ```

pub mod base;
pub mod git;
pub mod hg;
pub mod svn;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::core::{Result, VcsError};
use crate::run::ProgressCallback;
use crate::url::{SchemeConfig, convert_pip_url};
use git::{AsyncGitSync, GitRemote, GitSync};
use hg::{AsyncHgSync, HgSync};
use svn::{AsyncSvnSync, SvnAuth, SvnSync};

/// The supported version control systems.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VcsKind {
    Git,
    Hg,
    Svn,
}

impl VcsKind {
    pub const ALL: [Self; 3] = [Self::Git, Self::Hg, Self::Svn];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Git => "git",
            Self::Hg => "hg",
            Self::Svn => "svn",
        }
    }

    /// Metadata directory that marks a working copy.
    #[must_use]
    pub const fn metadata_dir(self) -> &'static str {
        match self {
            Self::Git => ".git",
            Self::Hg => ".hg",
            Self::Svn => ".svn",
        }
    }

    /// The VCS whose metadata directory exists under `path`.
    #[must_use]
    pub fn detect_working_copy(path: &Path) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| path.join(kind.metadata_dir()).is_dir())
    }
}

impl fmt::Display for VcsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VcsKind {
    type Err = VcsError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "git" => Ok(Self::Git),
            "hg" => Ok(Self::Hg),
            "svn" => Ok(Self::Svn),
            other => Err(VcsError::InvalidVcs {
                vcs: other.to_string(),
            }),
        }
    }
}

/// Step of the git update workflow that failed and was recovered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStep {
    Remotes,
    HeadSha,
    Fetch,
    Status,
    Checkout,
    Rebase,
    StashPop,
    Submodule,
}

impl fmt::Display for SyncStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Remotes => "set remotes",
            Self::HeadSha => "resolve HEAD",
            Self::Fetch => "fetch",
            Self::Status => "status",
            Self::Checkout => "checkout",
            Self::Rebase => "rebase",
            Self::StashPop => "stash pop",
            Self::Submodule => "submodule update",
        })
    }
}

/// How an `update_repo` call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The working copy was missing and has been checked out
    Cloned,
    /// HEAD already pointed at the requested local ref; nothing was changed
    AlreadyUpToDate,
    Updated,
    /// A step failed; the failure was logged and the working copy restored
    /// as far as possible
    Recovered { step: SyncStep, message: String },
}

impl UpdateOutcome {
    #[must_use]
    pub const fn is_recovered(&self) -> bool {
        matches!(self, Self::Recovered { .. })
    }
}

impl fmt::Display for UpdateOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cloned => f.write_str("cloned"),
            Self::AlreadyUpToDate => f.write_str("already up to date"),
            Self::Updated => f.write_str("updated"),
            Self::Recovered {
                step,
                message,
            } => write!(f, "{step} failed: {message}"),
        }
    }
}

/// Everything needed to construct a handle of any VCS.
///
/// Fields a VCS does not use are ignored (`remotes`, `git_shallow` and
/// `tls_verify` for git only, `svn_auth` for svn only).
#[derive(Clone)]
pub struct ProjectOptions {
    pub url: String,
    pub path: PathBuf,
    pub rev: Option<String>,
    pub remotes: BTreeMap<String, GitRemote>,
    pub progress: Option<ProgressCallback>,
    pub git_shallow: bool,
    pub tls_verify: bool,
    pub svn_auth: SvnAuth,
}

impl ProjectOptions {
    pub fn new(url: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            path: path.into(),
            rev: None,
            remotes: BTreeMap::new(),
            progress: None,
            git_shallow: false,
            tls_verify: true,
            svn_auth: SvnAuth::default(),
        }
    }

    fn git_builder(self) -> git::GitSyncBuilder {
        let mut builder = GitSync::builder(self.url, self.path)
            .maybe_rev(self.rev)
            .shallow(self.git_shallow)
            .tls_verify(self.tls_verify)
            .maybe_progress(self.progress);
        for remote in self.remotes.into_values() {
            builder = builder.remote_urls(remote.name, remote.fetch_url, remote.push_url);
        }
        builder
    }
}

impl fmt::Debug for ProjectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProjectOptions")
            .field("url", &self.url)
            .field("path", &self.path)
            .field("rev", &self.rev)
            .field("remotes", &self.remotes)
            .field("progress", &self.progress.is_some())
            .field("git_shallow", &self.git_shallow)
            .field("tls_verify", &self.tls_verify)
            .finish_non_exhaustive()
    }
}

/// A blocking handle of any VCS.
#[derive(Debug)]
pub enum Project {
    Git(GitSync),
    Hg(HgSync),
    Svn(SvnSync),
}

/// A tokio handle of any VCS.
#[derive(Debug)]
pub enum AsyncProject {
    Git(AsyncGitSync),
    Hg(AsyncHgSync),
    Svn(AsyncSvnSync),
}

macro_rules! delegate_accessors {
    ($ty:ident) => {
        impl $ty {
            #[must_use]
            pub const fn kind(&self) -> VcsKind {
                match self {
                    Self::Git(_) => VcsKind::Git,
                    Self::Hg(_) => VcsKind::Hg,
                    Self::Svn(_) => VcsKind::Svn,
                }
            }

            #[must_use]
            pub fn url(&self) -> &str {
                match self {
                    Self::Git(repo) => repo.url(),
                    Self::Hg(repo) => repo.url(),
                    Self::Svn(repo) => repo.url(),
                }
            }

            #[must_use]
            pub fn path(&self) -> &Path {
                match self {
                    Self::Git(repo) => repo.path(),
                    Self::Hg(repo) => repo.path(),
                    Self::Svn(repo) => repo.path(),
                }
            }

            #[must_use]
            pub fn repo_name(&self) -> String {
                match self {
                    Self::Git(repo) => repo.repo_name(),
                    Self::Hg(repo) => repo.repo_name(),
                    Self::Svn(repo) => repo.repo_name(),
                }
            }
        }
    };
}

delegate_accessors!(Project);
delegate_accessors!(AsyncProject);

impl Project {
    pub fn obtain(&self) -> Result<()> {
        match self {
            Self::Git(repo) => repo.obtain(),
            Self::Hg(repo) => repo.obtain(),
            Self::Svn(repo) => repo.obtain(),
        }
    }

    /// `set_remotes` only affects git working copies.
    pub fn update_repo(&self, set_remotes: bool) -> Result<UpdateOutcome> {
        match self {
            Self::Git(repo) => repo.update_repo(set_remotes),
            Self::Hg(repo) => repo.update_repo(),
            Self::Svn(repo) => repo.update_repo(),
        }
    }

    pub fn get_revision(&self) -> Result<String> {
        match self {
            Self::Git(repo) => repo.get_revision(),
            Self::Hg(repo) => repo.get_revision(),
            Self::Svn(repo) => repo.get_revision().map(|rev| rev.to_string()),
        }
    }
}

impl AsyncProject {
    pub async fn obtain(&self) -> Result<()> {
        match self {
            Self::Git(repo) => repo.obtain().await,
            Self::Hg(repo) => repo.obtain().await,
            Self::Svn(repo) => repo.obtain().await,
        }
    }

    pub async fn update_repo(&self, set_remotes: bool) -> Result<UpdateOutcome> {
        match self {
            Self::Git(repo) => repo.update_repo(set_remotes).await,
            Self::Hg(repo) => repo.update_repo().await,
            Self::Svn(repo) => repo.update_repo().await,
        }
    }

    pub async fn get_revision(&self) -> Result<String> {
        match self {
            Self::Git(repo) => repo.get_revision().await,
            Self::Hg(repo) => repo.get_revision().await,
            Self::Svn(repo) => repo.get_revision().await.map(|rev| rev.to_string()),
        }
    }
}

/// Constructor pair registered for one VCS name.
#[derive(Clone, Copy)]
pub struct Constructors {
    pub blocking: fn(ProjectOptions) -> Result<Project>,
    pub tokio: fn(ProjectOptions) -> Result<AsyncProject>,
}

fn git_project(options: ProjectOptions) -> Result<Project> {
    options.git_builder().build().map(Project::Git)
}

fn git_async_project(options: ProjectOptions) -> Result<AsyncProject> {
    options.git_builder().build_async().map(AsyncProject::Git)
}

fn hg_project(options: ProjectOptions) -> Result<Project> {
    Ok(Project::Hg(HgSync::new(&options.url, options.path, options.progress)))
}

fn hg_async_project(options: ProjectOptions) -> Result<AsyncProject> {
    Ok(AsyncProject::Hg(HgSync::new_async(&options.url, options.path, options.progress)))
}

fn svn_project(options: ProjectOptions) -> Result<Project> {
    Ok(Project::Svn(SvnSync::new(
        &options.url,
        options.path,
        options.rev,
        options.svn_auth,
        options.progress,
    )))
}

fn svn_async_project(options: ProjectOptions) -> Result<AsyncProject> {
    Ok(AsyncProject::Svn(SvnSync::new_async(
        &options.url,
        options.path,
        options.rev,
        options.svn_auth,
        options.progress,
    )))
}

/// Maps VCS names to handle constructors.
///
/// The default registry knows `git`, `hg` and `svn`. Urls are matched
/// against its [`SchemeConfig`] when no VCS name is given.
#[derive(Clone)]
pub struct ProjectRegistry {
    constructors: HashMap<&'static str, Constructors>,
    schemes: SchemeConfig,
}

impl Default for ProjectRegistry {
    fn default() -> Self {
        let mut registry = Self::empty(SchemeConfig::default());
        registry.register(
            VcsKind::Git.as_str(),
            Constructors {
                blocking: git_project,
                tokio: git_async_project,
            },
        );
        registry.register(
            VcsKind::Hg.as_str(),
            Constructors {
                blocking: hg_project,
                tokio: hg_async_project,
            },
        );
        registry.register(
            VcsKind::Svn.as_str(),
            Constructors {
                blocking: svn_project,
                tokio: svn_async_project,
            },
        );
        registry
    }
}

impl ProjectRegistry {
    /// A registry with no constructors.
    #[must_use]
    pub fn empty(schemes: SchemeConfig) -> Self {
        Self {
            constructors: HashMap::new(),
            schemes,
        }
    }

    pub fn register(&mut self, vcs: &'static str, constructors: Constructors) {
        self.constructors.insert(vcs, constructors);
    }

    #[must_use]
    pub fn is_registered(&self, vcs: &str) -> bool {
        self.constructors.contains_key(vcs)
    }

    #[must_use]
    pub const fn schemes(&self) -> &SchemeConfig {
        &self.schemes
    }

    /// Resolve the constructors and fill `rev` from a pip-style url.
    fn resolve(&self, mut options: ProjectOptions, vcs: Option<&str>) -> Result<(Constructors, ProjectOptions)> {
        let vcs = match vcs {
            Some(vcs) => vcs.to_string(),
            None => self.schemes.detect_one(&options.url)?.to_string(),
        };
        let constructors =
            self.constructors.get(vcs.as_str()).copied().ok_or_else(|| VcsError::VcsNotSupported {
                url: options.url.clone(),
                vcs: vcs.clone(),
            })?;

        if options.rev.is_none() && options.url.starts_with(&format!("{vcs}+")) {
            options.rev = convert_pip_url(&options.url, &self.schemes)?.rev;
        }
        Ok((constructors, options))
    }

    /// Build a blocking handle; `vcs` overrides url detection.
    ///
    /// # Errors
    ///
    /// [`VcsError::NoVcsForUrl`] or [`VcsError::MultipleVcsForUrl`] when
    /// detection fails, [`VcsError::VcsNotSupported`] for an unregistered
    /// VCS name, [`VcsError::MalformedUrl`] for a broken pip-style url.
    pub fn create(&self, options: ProjectOptions, vcs: Option<&str>) -> Result<Project> {
        let (constructors, options) = self.resolve(options, vcs)?;
        (constructors.blocking)(options)
    }

    /// Build a tokio handle; `vcs` overrides url detection.
    pub fn create_async(&self, options: ProjectOptions, vcs: Option<&str>) -> Result<AsyncProject> {
        let (constructors, options) = self.resolve(options, vcs)?;
        (constructors.tokio)(options)
    }
}

/// Build a blocking handle with the default registry.
pub fn create_project(options: ProjectOptions, vcs: Option<&str>) -> Result<Project> {
    ProjectRegistry::default().create(options, vcs)
}

/// Build a tokio handle with the default registry.
pub fn create_async_project(options: ProjectOptions, vcs: Option<&str>) -> Result<AsyncProject> {
    ProjectRegistry::default().create_async(options, vcs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vcs_kind_round_trip_names() {
        for kind in VcsKind::ALL {
            assert_eq!(kind.as_str().parse::<VcsKind>().unwrap(), kind);
        }
        assert!(matches!("cvs".parse::<VcsKind>().unwrap_err(), VcsError::InvalidVcs { .. }));
    }

    #[test]
    fn test_create_project_detects_vcs() {
        let project = create_project(ProjectOptions::new("hg+https://hg.example/r", "/tmp/r"), None).unwrap();
        assert_eq!(project.kind(), VcsKind::Hg);
        assert_eq!(project.url(), "https://hg.example/r");

        let project = create_project(ProjectOptions::new("svn://svn.example/trunk", "/tmp/trunk"), None).unwrap();
        assert_eq!(project.kind(), VcsKind::Svn);
    }

    #[test]
    fn test_create_project_takes_rev_from_pip_url() {
        let project =
            create_project(ProjectOptions::new("git+https://example.com/r.git@v2.0", "/tmp/r"), None).unwrap();
        let Project::Git(repo) = project else {
            panic!("expected a git project");
        };
        assert_eq!(repo.rev(), Some("v2.0"));
        assert_eq!(repo.url(), "https://example.com/r.git");
    }

    #[test]
    fn test_explicit_rev_wins() {
        let mut options = ProjectOptions::new("git+https://example.com/r.git@v2.0", "/tmp/r");
        options.rev = Some("main".to_string());
        let Project::Git(repo) = create_project(options, None).unwrap() else {
            panic!("expected a git project");
        };
        assert_eq!(repo.rev(), Some("main"));
    }

    #[test]
    fn test_explicit_vcs_overrides_detection() {
        let project =
            create_project(ProjectOptions::new("https://example.com/plain", "/tmp/r"), Some("git")).unwrap();
        assert_eq!(project.kind(), VcsKind::Git);
    }

    #[test]
    fn test_create_project_errors() {
        let err = create_project(ProjectOptions::new("https://example.com/plain", "/tmp/r"), None).unwrap_err();
        assert!(matches!(err, VcsError::NoVcsForUrl { .. }));

        let err =
            create_project(ProjectOptions::new("https://example.com/r", "/tmp/r"), Some("fossil")).unwrap_err();
        assert!(matches!(err, VcsError::VcsNotSupported { ref vcs, .. } if vcs == "fossil"));

        let registry = ProjectRegistry::empty(SchemeConfig::default());
        let err = registry.create(ProjectOptions::new("git+https://example.com/r", "/tmp/r"), None).unwrap_err();
        assert!(matches!(err, VcsError::VcsNotSupported { .. }));
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(UpdateOutcome::AlreadyUpToDate.to_string(), "already up to date");
        let outcome = UpdateOutcome::Recovered {
            step: SyncStep::Fetch,
            message: "network down".to_string(),
        };
        assert!(outcome.is_recovered());
        assert_eq!(outcome.to_string(), "fetch failed: network down");
    }

    #[test]
    fn test_detect_working_copy() {
        let temp = tempfile::TempDir::new().unwrap();
        assert!(VcsKind::detect_working_copy(temp.path()).is_none());
        std::fs::create_dir(temp.path().join(".hg")).unwrap();
        assert_eq!(VcsKind::detect_working_copy(temp.path()), Some(VcsKind::Hg));
    }
}
