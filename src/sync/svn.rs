//! Subversion repository handles.

use regex::Regex;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::Instrument;

use super::UpdateOutcome;
use super::base::SyncBase;
use crate::cmd::{Svn, SvnOptions};
use crate::core::{Result, VcsError};
use crate::run::{BlockingExecutor, Executor, ProgressCallback, TokioExecutor};
use crate::url::chomp_protocol;

static REVISION_ATTR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"revision="(\d+)""#).expect("revision pattern is valid"));

/// Credentials and certificate handling for a Subversion checkout.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SvnAuth {
    /// Passed as `--username`
    pub username: Option<String>,
    /// Passed as `--password`
    pub password: Option<String>,
    /// Adds `--trust-server-cert`
    pub trust_server_cert: bool,
}

#[derive(Debug)]
struct SvnState {
    base: SyncBase,
    svn: Svn,
    auth: SvnAuth,
}

impl SvnState {
    fn options(&self) -> SvnOptions {
        SvnOptions {
            username: self.auth.username.clone(),
            password: self.auth.password.clone(),
            revision: self.base.rev().map(str::to_string),
            trust_server_cert: self.auth.trust_server_cert,
            quiet: true,
        }
    }

    async fn obtain(&self, exec: &dyn Executor) -> Result<()> {
        self.base.ensure_dir()?;
        tracing::info!("Checking out.");
        exec.execute(self.svn.checkout(self.base.url(), &self.options())).await?;
        Ok(())
    }

    async fn update_repo(&self, exec: &dyn Executor) -> Result<UpdateOutcome> {
        self.base.ensure_dir()?;
        if !self.base.has_metadata(".svn") {
            self.obtain(exec).await?;
            return Ok(UpdateOutcome::Cloned);
        }
        exec.execute(self.svn.update(&self.options())).await?;
        Ok(UpdateOutcome::Updated)
    }

    async fn get_revision(&self, exec: &dyn Executor) -> Result<u64> {
        let xml = exec.execute(self.svn.info_xml()).await?;
        max_revision(&xml)
    }
}

/// Highest `revision="N"` attribute in `svn info --xml` output.
fn max_revision(xml: &str) -> Result<u64> {
    REVISION_ATTR
        .captures_iter(xml)
        .filter_map(|captures| captures[1].parse::<u64>().ok())
        .max()
        .ok_or_else(|| VcsError::Parse {
            what: "svn info".to_string(),
            reason: "no revision attribute".to_string(),
        })
}

/// A Subversion working copy.
pub struct SvnSync<E = BlockingExecutor> {
    state: SvnState,
    executor: E,
}

/// [`SvnSync`] running its commands on tokio.
pub type AsyncSvnSync = SvnSync<TokioExecutor>;

impl<E> SvnSync<E> {
    fn with_executor(
        url: &str,
        path: impl Into<PathBuf>,
        rev: Option<String>,
        auth: SvnAuth,
        executor: E,
    ) -> Self {
        let path = path.into();
        Self {
            state: SvnState {
                svn: Svn::new(&path),
                base: SyncBase::new("svn", chomp_protocol(url), path, rev),
                auth,
            },
            executor,
        }
    }

    /// Repository url without the `svn+` prefix.
    #[must_use]
    pub fn url(&self) -> &str {
        self.state.base.url()
    }

    /// Local working copy directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.state.base.path()
    }

    /// Revision passed to `-r`, if pinned.
    #[must_use]
    pub fn rev(&self) -> Option<&str> {
        self.state.base.rev()
    }

    /// Last path component of the url.
    #[must_use]
    pub fn repo_name(&self) -> String {
        self.state.base.repo_name()
    }

    /// Use a specific svn executable.
    #[must_use]
    pub fn with_binary(mut self, bin: impl Into<String>) -> Self {
        self.state.svn = self.state.svn.with_binary(bin);
        self
    }
}

impl SvnSync<BlockingExecutor> {
    /// Handle for `url` (an `svn+` prefix is stripped) checked out at `path`.
    pub fn new(
        url: &str,
        path: impl Into<PathBuf>,
        rev: Option<String>,
        auth: SvnAuth,
        progress: Option<ProgressCallback>,
    ) -> Self {
        Self::with_executor(url, path, rev, auth, BlockingExecutor::new(progress))
    }

    fn block<T>(&self, future: impl Future<Output = Result<T>>) -> Result<T> {
        let _entered = self.state.base.span().enter();
        futures::executor::block_on(future)
    }

    /// `svn checkout` into the working copy directory.
    pub fn obtain(&self) -> Result<()> {
        self.block(self.state.obtain(&self.executor))
    }

    /// Check out if missing, otherwise `svn update` to the requested revision.
    pub fn update_repo(&self) -> Result<UpdateOutcome> {
        self.block(self.state.update_repo(&self.executor))
    }

    /// Highest revision in the working copy.
    pub fn get_revision(&self) -> Result<u64> {
        self.block(self.state.get_revision(&self.executor))
    }
}

impl SvnSync<TokioExecutor> {
    /// Tokio handle; a synchronous progress callback is wrapped.
    pub fn new_async(
        url: &str,
        path: impl Into<PathBuf>,
        rev: Option<String>,
        auth: SvnAuth,
        progress: Option<ProgressCallback>,
    ) -> Self {
        Self::with_executor(url, path, rev, auth, TokioExecutor::with_sync_progress(progress))
    }

    async fn traced<T>(&self, future: impl Future<Output = Result<T>>) -> Result<T> {
        future.instrument(self.state.base.span().clone()).await
    }

    /// See [`SvnSync::obtain`].
    pub async fn obtain(&self) -> Result<()> {
        self.traced(self.state.obtain(&self.executor)).await
    }

    /// See [`SvnSync::update_repo`].
    pub async fn update_repo(&self) -> Result<UpdateOutcome> {
        self.traced(self.state.update_repo(&self.executor)).await
    }

    /// See [`SvnSync::get_revision`].
    pub async fn get_revision(&self) -> Result<u64> {
        self.traced(self.state.get_revision(&self.executor)).await
    }
}

impl<E> std::fmt::Debug for SvnSync<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SvnSync")
            .field("url", &self.url())
            .field("path", &self.path())
            .field("rev", &self.rev())
            .finish_non_exhaustive()
    }
}
