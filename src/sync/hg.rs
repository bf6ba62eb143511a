//! Mercurial repository handles.
//!
//! Unlike git, every failing command propagates: there is no recovery ladder
//! for Mercurial working copies.

use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::Instrument;

use super::UpdateOutcome;
use super::base::SyncBase;
use crate::cmd::Hg;
use crate::core::Result;
use crate::run::{BlockingExecutor, Executor, ProgressCallback, TokioExecutor};
use crate::url::chomp_protocol;

#[derive(Debug)]
struct HgState {
    base: SyncBase,
    hg: Hg,
}

impl HgState {
    async fn obtain(&self, exec: &dyn Executor) -> Result<()> {
        self.base.ensure_dir()?;
        tracing::info!("Cloning.");
        exec.execute(self.hg.clone(self.base.url(), true, true)).await?;
        exec.execute(self.hg.update(true)).await?;
        Ok(())
    }

    async fn update_repo(&self, exec: &dyn Executor) -> Result<UpdateOutcome> {
        self.base.ensure_dir()?;
        if !self.base.has_metadata(".hg") {
            self.obtain(exec).await?;
            return Ok(UpdateOutcome::Cloned);
        }
        exec.execute(self.hg.update(false)).await?;
        exec.execute(self.hg.pull(true)).await?;
        Ok(UpdateOutcome::Updated)
    }

    /// Local revision number of the working copy's parent.
    async fn get_revision(&self, exec: &dyn Executor) -> Result<String> {
        exec.execute(self.hg.parents("{rev}")).await
    }
}

/// A Mercurial working copy.
pub struct HgSync<E = BlockingExecutor> {
    state: HgState,
    executor: E,
}

/// [`HgSync`] running its commands on tokio.
pub type AsyncHgSync = HgSync<TokioExecutor>;

impl<E> HgSync<E> {
    fn with_executor(url: &str, path: impl Into<PathBuf>, executor: E) -> Self {
        let path = path.into();
        Self {
            state: HgState {
                hg: Hg::new(&path),
                base: SyncBase::new("hg", chomp_protocol(url), path, None),
            },
            executor,
        }
    }

    /// Repository url without the `hg+` prefix.
    #[must_use]
    pub fn url(&self) -> &str {
        self.state.base.url()
    }

    /// Local working copy directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.state.base.path()
    }

    /// Last path component of the url.
    #[must_use]
    pub fn repo_name(&self) -> String {
        self.state.base.repo_name()
    }

    /// Use a specific hg executable.
    #[must_use]
    pub fn with_binary(mut self, bin: impl Into<String>) -> Self {
        self.state.hg = self.state.hg.with_binary(bin);
        self
    }
}

impl HgSync<BlockingExecutor> {
    /// Handle for `url` (an `hg+` prefix is stripped) checked out at `path`.
    pub fn new(url: &str, path: impl Into<PathBuf>, progress: Option<ProgressCallback>) -> Self {
        Self::with_executor(url, path, BlockingExecutor::new(progress))
    }

    fn block<T>(&self, future: impl Future<Output = Result<T>>) -> Result<T> {
        let _entered = self.state.base.span().enter();
        futures::executor::block_on(future)
    }

    /// `hg clone --noupdate` followed by `hg update`.
    pub fn obtain(&self) -> Result<()> {
        self.block(self.state.obtain(&self.executor))
    }

    /// Clone if missing, otherwise `hg update` and `hg pull --update`.
    pub fn update_repo(&self) -> Result<UpdateOutcome> {
        self.block(self.state.update_repo(&self.executor))
    }

    /// Local revision number of the working copy's parent.
    pub fn get_revision(&self) -> Result<String> {
        self.block(self.state.get_revision(&self.executor))
    }
}

impl HgSync<TokioExecutor> {
    /// Tokio handle; a synchronous progress callback is wrapped.
    pub fn new_async(url: &str, path: impl Into<PathBuf>, progress: Option<ProgressCallback>) -> Self {
        Self::with_executor(url, path, TokioExecutor::with_sync_progress(progress))
    }

    async fn traced<T>(&self, future: impl Future<Output = Result<T>>) -> Result<T> {
        future.instrument(self.state.base.span().clone()).await
    }

    /// See [`HgSync::obtain`].
    pub async fn obtain(&self) -> Result<()> {
        self.traced(self.state.obtain(&self.executor)).await
    }

    /// See [`HgSync::update_repo`].
    pub async fn update_repo(&self) -> Result<UpdateOutcome> {
        self.traced(self.state.update_repo(&self.executor)).await
    }

    /// See [`HgSync::get_revision`].
    pub async fn get_revision(&self) -> Result<String> {
        self.traced(self.state.get_revision(&self.executor)).await
    }
}

impl<E> std::fmt::Debug for HgSync<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HgSync")
            .field("url", &self.url())
            .field("path", &self.path())
            .finish_non_exhaustive()
    }
}
