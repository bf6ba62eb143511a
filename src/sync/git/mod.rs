//! Git repository handles.
//!
//! [`GitSync`] binds a working copy path to a remote url and a set of named
//! remotes. The same workflow backs two flavors:
//!
//! - `GitSync` (the default, [`BlockingExecutor`]) blocks the calling thread
//! - [`AsyncGitSync`] ([`TokioExecutor`]) yields at every git invocation, so
//!   many repositories can be synchronized concurrently on one runtime
//!
//! ```rust,no_run
//! use vcsync::sync::git::GitSync;
//! use vcsync::sync::UpdateOutcome;
//!
//! # fn example() -> vcsync::core::Result<()> {
//! let repo = GitSync::builder("git+https://github.com/vcs-python/libvcs", "/tmp/libvcs")
//!     .remote("upstream", "https://github.com/vcs-python/libvcs")
//!     .shallow(true)
//!     .build()?;
//!
//! match repo.update_repo(true)? {
//!     UpdateOutcome::Recovered { step, message } => eprintln!("{step}: {message}"),
//!     outcome => println!("{outcome}"),
//! }
//! println!("at {}", repo.get_revision()?);
//! # Ok(())
//! # }
//! ```

pub mod status;
mod workflow;

pub use status::GitStatus;

use semver::Version;
use serde::Serialize;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::Instrument;

use super::UpdateOutcome;
use super::base::SyncBase;
use crate::cmd::{CloneOptions, Git};
use crate::constants::ORIGIN;
use crate::core::{Result, VcsError};
use crate::run::{AsyncProgressCallback, BlockingExecutor, ProgressCallback, TokioExecutor};
use crate::url::chomp_protocol;

/// A named remote with its fetch and push URLs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GitRemote {
    pub name: String,
    pub fetch_url: String,
    pub push_url: String,
}

impl GitRemote {
    /// Remote whose fetch and push URL are the same.
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            name: name.into(),
            fetch_url: url.clone(),
            push_url: url,
        }
    }
}

/// Everything the workflow needs, independent of the executor.
#[derive(Debug)]
pub(crate) struct GitState {
    base: SyncBase,
    git: Git,
    remotes: BTreeMap<String, GitRemote>,
    clone_options: CloneOptions,
}

/// A git working copy and the remotes it should track.
pub struct GitSync<E = BlockingExecutor> {
    state: GitState,
    executor: E,
}

/// [`GitSync`] running its commands on tokio.
pub type AsyncGitSync = GitSync<TokioExecutor>;

/// Builder for [`GitSync`] and [`AsyncGitSync`].
#[must_use]
pub struct GitSyncBuilder {
    url: String,
    path: PathBuf,
    rev: Option<String>,
    remotes: BTreeMap<String, GitRemote>,
    clone_options: CloneOptions,
    binary: Option<String>,
    progress: Option<ProgressCallback>,
}

impl GitSyncBuilder {
    fn new(url: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            path: path.into(),
            rev: None,
            remotes: BTreeMap::new(),
            clone_options: CloneOptions::default(),
            binary: None,
            progress: None,
        }
    }

    /// Branch, tag or commit to keep the working copy at.
    pub fn rev(mut self, rev: impl Into<String>) -> Self {
        self.rev = Some(rev.into());
        self
    }

    pub fn maybe_rev(mut self, rev: Option<String>) -> Self {
        self.rev = rev;
        self
    }

    /// Remote fetching from and pushing to `url`.
    pub fn remote(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
        let remote = GitRemote::new(name, url);
        self.remotes.insert(remote.name.clone(), remote);
        self
    }

    /// Remote with distinct fetch and push URLs.
    pub fn remote_urls(
        mut self,
        name: impl Into<String>,
        fetch_url: impl Into<String>,
        push_url: impl Into<String>,
    ) -> Self {
        let name = name.into();
        self.remotes.insert(
            name.clone(),
            GitRemote {
                name,
                fetch_url: fetch_url.into(),
                push_url: push_url.into(),
            },
        );
        self
    }

    /// Clone with `--depth 1`.
    pub const fn shallow(mut self, shallow: bool) -> Self {
        self.clone_options.shallow = shallow;
        self
    }

    /// Verify TLS certificates while cloning (on by default).
    pub const fn tls_verify(mut self, verify: bool) -> Self {
        self.clone_options.tls_verify = verify;
        self
    }

    /// Use a specific git executable.
    pub fn binary(mut self, bin: impl Into<String>) -> Self {
        self.binary = Some(bin.into());
        self
    }

    /// Receive git's progress output while cloning, fetching and updating submodules.
    pub fn progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn maybe_progress(mut self, progress: Option<ProgressCallback>) -> Self {
        self.progress = progress;
        self
    }

    fn into_state(self) -> Result<(GitState, Option<ProgressCallback>)> {
        let mut remotes: BTreeMap<String, GitRemote> = self
            .remotes
            .into_values()
            .map(|remote| {
                let remote = GitRemote {
                    fetch_url: chomp_protocol(&remote.fetch_url),
                    push_url: chomp_protocol(&remote.push_url),
                    name: remote.name,
                };
                (remote.name.clone(), remote)
            })
            .collect();

        if !self.url.is_empty() && !remotes.contains_key(ORIGIN) {
            remotes.insert(ORIGIN.to_string(), GitRemote::new(ORIGIN, chomp_protocol(&self.url)));
        }

        let url = remotes
            .get(ORIGIN)
            .or_else(|| remotes.values().next())
            .map(|origin| origin.fetch_url.clone())
            .ok_or_else(|| VcsError::RemoteOriginMissing {
                path: self.path.display().to_string(),
            })?;

        let mut git = Git::new(&self.path);
        if let Some(bin) = self.binary {
            git = git.with_binary(bin);
        }

        Ok((
            GitState {
                base: SyncBase::new("git", url, self.path, self.rev),
                git,
                remotes,
                clone_options: self.clone_options,
            },
            self.progress,
        ))
    }

    /// Build a blocking handle.
    ///
    /// # Errors
    ///
    /// [`VcsError::RemoteOriginMissing`] when neither a url nor any remote is given.
    pub fn build(self) -> Result<GitSync> {
        let (state, progress) = self.into_state()?;
        Ok(GitSync {
            state,
            executor: BlockingExecutor::new(progress),
        })
    }

    /// Build a tokio handle; a synchronous progress callback is wrapped.
    pub fn build_async(self) -> Result<AsyncGitSync> {
        let (state, progress) = self.into_state()?;
        Ok(GitSync {
            state,
            executor: TokioExecutor::with_sync_progress(progress),
        })
    }

    /// Build a tokio handle with an awaited progress callback.
    pub fn build_async_with(self, progress: AsyncProgressCallback) -> Result<AsyncGitSync> {
        let (state, _) = self.into_state()?;
        Ok(GitSync {
            state,
            executor: TokioExecutor::new(Some(progress)),
        })
    }
}

impl GitSync {
    /// Start building a handle for `url` checked out at `path`.
    ///
    /// A `git+` prefix and an `@rev` suffix on the url are stripped.
    pub fn builder(url: impl Into<String>, path: impl Into<PathBuf>) -> GitSyncBuilder {
        GitSyncBuilder::new(url, path)
    }
}

impl<E> GitSync<E> {
    /// Url of the `origin` remote, as passed to `git clone`.
    #[must_use]
    pub fn url(&self) -> &str {
        self.state.base.url()
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.state.base.path()
    }

    #[must_use]
    pub fn rev(&self) -> Option<&str> {
        self.state.base.rev()
    }

    #[must_use]
    pub fn repo_name(&self) -> String {
        self.state.base.repo_name()
    }

    /// Remotes this handle reconciles with [`set_remotes`](GitSync::set_remotes).
    #[must_use]
    pub const fn configured_remotes(&self) -> &BTreeMap<String, GitRemote> {
        &self.state.remotes
    }
}

impl GitSync<BlockingExecutor> {
    fn block<T>(&self, future: impl Future<Output = Result<T>>) -> Result<T> {
        let _entered = self.state.base.span().enter();
        futures::executor::block_on(future)
    }

    /// Clone the repository, initialize submodules and set remotes.
    ///
    /// # Errors
    ///
    /// Any failing git command; the working copy is not cleaned up.
    pub fn obtain(&self) -> Result<()> {
        self.block(self.state.obtain(&self.executor))
    }

    /// Bring the working copy to the requested revision, cloning it first if needed.
    ///
    /// # Errors
    ///
    /// Only for a failed first clone or an unparseable `show-ref`; every
    /// other failure is reported as [`UpdateOutcome::Recovered`].
    pub fn update_repo(&self, set_remotes: bool) -> Result<UpdateOutcome> {
        self.block(self.state.update_repo(&self.executor, set_remotes))
    }

    /// Commit hash of HEAD, or `"initial"` before the first commit.
    pub fn get_revision(&self) -> Result<String> {
        self.block(self.state.get_revision(&self.executor))
    }

    pub fn get_git_version(&self) -> Result<Version> {
        self.block(self.state.get_git_version(&self.executor))
    }

    pub fn status(&self) -> Result<GitStatus> {
        self.block(self.state.status(&self.executor))
    }

    pub fn get_current_remote_name(&self) -> Result<String> {
        self.block(self.state.get_current_remote_name(&self.executor))
    }

    /// Remotes as git currently reports them.
    pub fn remotes(&self) -> Result<BTreeMap<String, GitRemote>> {
        self.block(self.state.remotes(&self.executor))
    }

    pub fn remote(&self, name: &str) -> Result<Option<GitRemote>> {
        self.block(self.state.remote(&self.executor, name))
    }

    /// Add or retarget one remote.
    ///
    /// # Errors
    ///
    /// Adding a remote that already exists fails unless `overwrite` or
    /// `push` is set; [`VcsError::RemoteSetFailed`] if the remote is missing
    /// afterwards.
    pub fn set_remote(&self, name: &str, url: &str, push: bool, overwrite: bool) -> Result<GitRemote> {
        self.block(self.state.set_remote(&self.executor, name, url, push, overwrite))
    }

    pub fn set_remotes(&self, overwrite: bool) -> Result<()> {
        self.block(self.state.set_remotes(&self.executor, overwrite))
    }
}

impl GitSync<TokioExecutor> {
    async fn traced<T>(&self, future: impl Future<Output = Result<T>>) -> Result<T> {
        future.instrument(self.state.base.span().clone()).await
    }

    /// See [`GitSync::obtain`].
    pub async fn obtain(&self) -> Result<()> {
        self.traced(self.state.obtain(&self.executor)).await
    }

    /// See [`GitSync::update_repo`].
    pub async fn update_repo(&self, set_remotes: bool) -> Result<UpdateOutcome> {
        self.traced(self.state.update_repo(&self.executor, set_remotes)).await
    }

    pub async fn get_revision(&self) -> Result<String> {
        self.traced(self.state.get_revision(&self.executor)).await
    }

    pub async fn get_git_version(&self) -> Result<Version> {
        self.traced(self.state.get_git_version(&self.executor)).await
    }

    pub async fn status(&self) -> Result<GitStatus> {
        self.traced(self.state.status(&self.executor)).await
    }

    pub async fn get_current_remote_name(&self) -> Result<String> {
        self.traced(self.state.get_current_remote_name(&self.executor)).await
    }

    pub async fn remotes(&self) -> Result<BTreeMap<String, GitRemote>> {
        self.traced(self.state.remotes(&self.executor)).await
    }

    pub async fn remote(&self, name: &str) -> Result<Option<GitRemote>> {
        self.traced(self.state.remote(&self.executor, name)).await
    }

    pub async fn set_remote(
        &self,
        name: &str,
        url: &str,
        push: bool,
        overwrite: bool,
    ) -> Result<GitRemote> {
        self.traced(self.state.set_remote(&self.executor, name, url, push, overwrite)).await
    }

    pub async fn set_remotes(&self, overwrite: bool) -> Result<()> {
        self.traced(self.state.set_remotes(&self.executor, overwrite)).await
    }
}

impl<E> std::fmt::Debug for GitSync<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitSync")
            .field("url", &self.url())
            .field("path", &self.path())
            .field("rev", &self.rev())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_origin_defaults_to_url() {
        let repo = GitSync::builder("git+https://github.com/vcs-python/libvcs.git", "/tmp/libvcs")
            .build()
            .unwrap();
        assert_eq!(repo.url(), "https://github.com/vcs-python/libvcs.git");
        let origin = &repo.configured_remotes()[ORIGIN];
        assert_eq!(origin.fetch_url, "https://github.com/vcs-python/libvcs.git");
        assert_eq!(origin.push_url, origin.fetch_url);
        assert_eq!(repo.repo_name(), "libvcs");
    }

    #[test]
    fn test_explicit_origin_wins_over_url() {
        let repo = GitSync::builder("https://example.com/mirror.git", "/tmp/r")
            .remote_urls(ORIGIN, "https://example.com/main.git", "git@example.com:main.git")
            .remote("upstream", "git+https://example.com/upstream.git")
            .build()
            .unwrap();
        assert_eq!(repo.url(), "https://example.com/main.git");
        let remotes = repo.configured_remotes();
        assert_eq!(remotes.len(), 2);
        assert_eq!(remotes[ORIGIN].push_url, "git@example.com:main.git");
        assert_eq!(remotes["upstream"].fetch_url, "https://example.com/upstream.git");
    }

    #[test]
    fn test_first_remote_used_without_url() {
        let repo = GitSync::builder("", "/tmp/r")
            .remote("upstream", "https://example.com/upstream.git")
            .build()
            .unwrap();
        assert_eq!(repo.url(), "https://example.com/upstream.git");
    }

    #[test]
    fn test_missing_origin_is_an_error() {
        let err = GitSync::builder("", "/tmp/r").build().unwrap_err();
        assert!(matches!(err, VcsError::RemoteOriginMissing { .. }));
    }

    #[test]
    fn test_rev_from_builder() {
        let repo = GitSync::builder("https://example.com/r.git", "/tmp/r").rev("v1.2.3").build().unwrap();
        assert_eq!(repo.rev(), Some("v1.2.3"));
    }
}
