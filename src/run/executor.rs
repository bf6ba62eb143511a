//! Scheduling seam between the synchronizers and the runners.
//!
//! The git, Mercurial and Subversion workflows are written once as async
//! code against [`Executor`]. [`BlockingExecutor`] completes every command
//! before returning its future, so the workflows can be driven by
//! `futures::executor::block_on` without a runtime. [`TokioExecutor`] awaits
//! [`async_run`] and yields to the scheduler at every command.

use futures::future::{self, BoxFuture, FutureExt};

use super::{
    AsyncProgressCallback, CommandRequest, ProgressCallback, async_run, run, wrap_sync_callback,
};
use crate::core::Result;

/// Executes command requests on behalf of a repository handle.
///
/// The handle's progress callback is owned by the executor and attached only
/// to requests marked with `log_in_real_time`.
pub trait Executor: Send + Sync {
    /// Run the request and return its normalized output.
    fn execute(&self, request: CommandRequest) -> BoxFuture<'_, Result<String>>;
}

/// Runs commands on the calling thread with [`run`].
#[derive(Clone, Default)]
pub struct BlockingExecutor {
    progress: Option<ProgressCallback>,
}

impl BlockingExecutor {
    #[must_use]
    pub const fn new(progress: Option<ProgressCallback>) -> Self {
        Self {
            progress,
        }
    }
}

impl Executor for BlockingExecutor {
    fn execute(&self, request: CommandRequest) -> BoxFuture<'_, Result<String>> {
        let callback = self.progress.as_ref().filter(|_| request.is_log_in_real_time());
        future::ready(run(&request, callback)).boxed()
    }
}

/// Runs commands on the tokio runtime with [`async_run`].
#[derive(Clone, Default)]
pub struct TokioExecutor {
    progress: Option<AsyncProgressCallback>,
}

impl TokioExecutor {
    #[must_use]
    pub const fn new(progress: Option<AsyncProgressCallback>) -> Self {
        Self {
            progress,
        }
    }

    /// Build an executor from a synchronous progress callback.
    #[must_use]
    pub fn with_sync_progress(progress: Option<ProgressCallback>) -> Self {
        Self::new(progress.map(wrap_sync_callback))
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, request: CommandRequest) -> BoxFuture<'_, Result<String>> {
        async move {
            let callback = self.progress.as_ref().filter(|_| request.is_log_in_real_time());
            async_run(&request, callback).await
        }
        .boxed()
    }
}
