//! The git synchronization workflow.
//!
//! Written once against [`Executor`]; the blocking and tokio façades in the
//! parent module only choose the executor and how the future is driven.
//!
//! Failure policy of [`GitState::update_repo`]: a first clone propagates its
//! error, every later step that fails is logged at error level and reported
//! as [`UpdateOutcome::Recovered`] so a caller looping over many
//! repositories keeps going.

use regex::Regex;
use semver::Version;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use super::{GitRemote, GitState, GitStatus};
use crate::constants::{FALLBACK_GIT_REF, INITIAL_REVISION, ORIGIN};
use crate::core::{Result, VcsError};
use crate::run::{CommandRequest, Executor};
use crate::sync::{SyncStep, UpdateOutcome};
use crate::url::chomp_protocol;

/// `<sha> refs/remotes/<remote>/<branch>` line of `git show-ref`
static REMOTE_REF_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9a-f]{40,64} refs/remotes/(?P<remote>[^/]+)/(?P<tag>.+)$")
        .expect("remote ref pattern is valid")
});

fn recovered(step: SyncStep, message: String) -> UpdateOutcome {
    tracing::error!("{message}");
    UpdateOutcome::Recovered {
        step,
        message,
    }
}

/// Resolved target of an update.
#[derive(Debug)]
struct Target {
    remote: String,
    tag: String,
    is_remote_ref: bool,
}

impl Target {
    fn upstream(&self) -> String {
        format!("{}/{}", self.remote, self.tag)
    }
}

impl GitState {
    async fn run(&self, exec: &dyn Executor, request: CommandRequest) -> Result<String> {
        exec.execute(request).await
    }

    /// Clone, initialize submodules and reconcile remotes.
    pub(super) async fn obtain(&self, exec: &dyn Executor) -> Result<()> {
        self.base.ensure_dir()?;

        tracing::info!("Cloning.");
        let clone = self.git.clone(self.base.url(), &self.clone_options).log_in_real_time(true);
        self.run(exec, clone).await?;

        tracing::info!("Initializing submodules.");
        self.run(exec, self.git.submodule_init().log_in_real_time(true)).await?;
        self.run(exec, self.git.submodule_update().log_in_real_time(true)).await?;

        self.set_remotes(exec, true).await
    }

    pub(super) async fn update_repo(
        &self,
        exec: &dyn Executor,
        set_remotes: bool,
    ) -> Result<UpdateOutcome> {
        self.base.ensure_dir()?;

        if !self.base.has_metadata(".git") {
            self.obtain(exec).await?;
            return Ok(match self.update_existing(exec, set_remotes).await? {
                outcome @ UpdateOutcome::Recovered { .. } => outcome,
                _ => UpdateOutcome::Cloned,
            });
        }

        self.update_existing(exec, set_remotes).await
    }

    async fn update_existing(
        &self,
        exec: &dyn Executor,
        set_remotes: bool,
    ) -> Result<UpdateOutcome> {
        if set_remotes && let Err(e) = self.set_remotes(exec, true).await {
            return Ok(recovered(SyncStep::Remotes, format!("Failed to set remotes: {e}")));
        }

        let requested = self.target_ref(exec).await;
        tracing::debug!("git_tag: {requested}");
        tracing::info!("Updating to '{requested}'.");

        let head_sha = match self.run(exec, self.git.rev_list_one("HEAD")).await {
            Ok(sha) => sha,
            Err(e) => {
                return Ok(recovered(
                    SyncStep::HeadSha,
                    format!("Failed to get the hash for HEAD: {e}"),
                ));
            }
        };
        tracing::debug!("head_sha: {head_sha}");

        let target = self.resolve_target(exec, requested).await?;

        // Fails when the ref has not been fetched yet
        let rev = if target.is_remote_ref { target.upstream() } else { target.tag.clone() };
        let tag_sha = match self.run(exec, self.git.rev_list_one(&rev)).await {
            Ok(sha) => Some(sha),
            Err(e) => {
                tracing::debug!("rev-list {rev} failed: {e}");
                None
            }
        };
        tracing::debug!("tag_sha: {tag_sha:?}");

        if !target.is_remote_ref && tag_sha.as_deref() == Some(head_sha.as_str()) {
            tracing::info!("Already up-to-date.");
            return Ok(UpdateOutcome::AlreadyUpToDate);
        }

        if let Err(e) = self.run(exec, self.git.fetch().log_in_real_time(true)).await {
            return Ok(recovered(
                SyncStep::Fetch,
                format!("Failed to fetch repository '{}': {e}", self.base.url()),
            ));
        }

        if target.is_remote_ref && self.is_synced(exec, &target, &head_sha).await {
            tracing::info!("Already up-to-date.");
            return Ok(UpdateOutcome::AlreadyUpToDate);
        }

        let outcome = if target.is_remote_ref {
            self.rebase_onto_remote(exec, &target, &head_sha).await
        } else {
            self.checkout(exec, &target.tag).await
        };
        if let Some(outcome) = outcome {
            return Ok(outcome);
        }

        if let Err(e) = self.run(exec, self.git.submodule_update().log_in_real_time(true)).await {
            return Ok(recovered(SyncStep::Submodule, format!("Failed to update submodules: {e}")));
        }
        Ok(UpdateOutcome::Updated)
    }

    /// The handle's `rev`, else the current branch, else `origin/master`.
    async fn target_ref(&self, exec: &dyn Executor) -> String {
        if let Some(rev) = self.base.rev() {
            return rev.to_string();
        }
        tracing::debug!("No git revision set, defaulting to the current branch");
        match self.run(exec, self.git.symbolic_ref_short()).await {
            Ok(symref) if !symref.trim().is_empty() => symref.trim().to_string(),
            _ => FALLBACK_GIT_REF.to_string(),
        }
    }

    /// Classify `tag` as remote-tracking or local and pick its remote.
    async fn resolve_target(&self, exec: &dyn Executor, tag: String) -> Result<Target> {
        let show_ref = self.run(exec, self.git.show_ref(&tag)).await?;
        tracing::debug!("show_ref_output: {show_ref}");
        let is_remote_ref = show_ref.contains("remotes");
        tracing::debug!("is_remote_ref: {is_remote_ref}");

        let mut target = Target {
            remote: self.current_remote_name(exec).await,
            tag,
            is_remote_ref,
        };

        let remote_ref = format!("refs/remotes/{}", target.tag);
        if show_ref.contains(&remote_ref) {
            let captures = show_ref
                .lines()
                .filter(|line| line.contains(&remote_ref))
                .find_map(|line| REMOTE_REF_LINE.captures(line))
                .ok_or_else(|| VcsError::RemoteRefNotFound {
                    reference: target.tag.clone(),
                })?;
            target.remote = captures["remote"].to_string();
            target.tag = captures["tag"].to_string();
        }
        tracing::debug!("git_remote_name: {}", target.remote);
        tracing::debug!("git_tag: {}", target.tag);
        Ok(target)
    }

    /// HEAD is the fetched upstream commit and the target branch is checked out.
    async fn is_synced(&self, exec: &dyn Executor, target: &Target, head_sha: &str) -> bool {
        let Ok(upstream_sha) = self.run(exec, self.git.rev_list_one(&target.upstream())).await else {
            return false;
        };
        if upstream_sha != head_sha {
            return false;
        }
        matches!(
            self.run(exec, self.git.symbolic_ref_short()).await,
            Ok(branch) if branch == target.tag
        )
    }

    async fn current_remote_name(&self, exec: &dyn Executor) -> String {
        match self.get_current_remote_name(exec).await {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!("Could not determine the current remote, using {ORIGIN}: {e}");
                ORIGIN.to_string()
            }
        }
    }

    /// Stash, checkout, rebase and unstash; `None` when every step succeeded.
    async fn rebase_onto_remote(
        &self,
        exec: &dyn Executor,
        target: &Target,
        head_sha: &str,
    ) -> Option<UpdateOutcome> {
        let need_stash = match self.run(exec, self.git.status_porcelain()).await {
            Ok(status) => !status.is_empty(),
            Err(e) => {
                return Some(recovered(SyncStep::Status, format!("Failed to get the status: {e}")));
            }
        };

        if need_stash && let Err(e) = self.run(exec, self.git.stash_save()).await {
            tracing::error!("Failed to stash changes: {e}");
        }

        if let Err(e) = self.run(exec, self.git.checkout(&target.tag)).await {
            return Some(recovered(
                SyncStep::Checkout,
                format!("Failed to checkout tag: '{}': {e}", target.tag),
            ));
        }

        if let Err(e) = self.run(exec, self.git.rebase(&target.upstream())).await {
            let message = e.to_string();
            if message.contains("invalid_upstream") || message.contains("Aborting") {
                // The rebase never started, so there is nothing to abort
                if need_stash {
                    self.best_effort(exec, self.git.stash_pop(true)).await;
                }
                return Some(recovered(SyncStep::Rebase, message));
            }
            self.best_effort(exec, self.git.rebase_abort()).await;
            if need_stash {
                self.best_effort(exec, self.git.stash_pop(true)).await;
            }
            return Some(recovered(
                SyncStep::Rebase,
                format!(
                    "Failed to rebase in: '{}'. You will have to resolve the conflicts manually",
                    self.base.path().display()
                ),
            ));
        }

        if need_stash && self.run(exec, self.git.stash_pop(true)).await.is_err() {
            // Retry without restoring the index
            self.best_effort(exec, self.git.reset_hard(None)).await;
            if self.run(exec, self.git.stash_pop(false)).await.is_err() {
                self.best_effort(exec, self.git.reset_hard(Some(head_sha))).await;
                self.best_effort(exec, self.git.stash_pop(true)).await;
                return Some(recovered(
                    SyncStep::StashPop,
                    format!(
                        "Failed to rebase in: '{}'. You will have to resolve the conflicts manually",
                        self.base.path().display()
                    ),
                ));
            }
        }
        None
    }

    async fn checkout(&self, exec: &dyn Executor, tag: &str) -> Option<UpdateOutcome> {
        match self.run(exec, self.git.checkout(tag)).await {
            Ok(_) => None,
            Err(e) => {
                Some(recovered(SyncStep::Checkout, format!("Failed to checkout tag: '{tag}': {e}")))
            }
        }
    }

    async fn best_effort(&self, exec: &dyn Executor, request: CommandRequest) {
        let cmd = request.render();
        if let Err(e) = self.run(exec, request).await {
            tracing::warn!("{cmd} failed during recovery: {e}");
        }
    }

    /// Current commit hash, or `"initial"` for a repository without commits.
    pub(super) async fn get_revision(&self, exec: &dyn Executor) -> Result<String> {
        match self.run(exec, self.git.rev_parse_verify("HEAD")).await {
            Ok(sha) => Ok(sha),
            Err(VcsError::CommandFailed(_)) => Ok(INITIAL_REVISION.to_string()),
            Err(e) => Err(e),
        }
    }

    pub(super) async fn get_git_version(&self, exec: &dyn Executor) -> Result<Version> {
        let output = self.run(exec, self.git.version()).await?;
        parse_git_version(&output)
    }

    pub(super) async fn status(&self, exec: &dyn Executor) -> Result<GitStatus> {
        let output = self.run(exec, self.git.status_branch()).await?;
        GitStatus::from_porcelain(&output)
    }

    /// Remote of the checked out branch: `branch.<head>.remote`, then the
    /// upstream's remote, then `origin`.
    pub(super) async fn get_current_remote_name(&self, exec: &dyn Executor) -> Result<String> {
        let status = self.status(exec).await?;
        if let Some(head) = status.branch_head.as_deref().filter(|head| *head != "(detached)") {
            let key = format!("branch.{head}.remote");
            if let Ok(remote) = self.run(exec, self.git.config_get(&key)).await
                && !remote.is_empty()
            {
                return Ok(remote);
            }
        }
        Ok(status.upstream_remote().unwrap_or(ORIGIN).to_string())
    }

    pub(super) async fn remotes(&self, exec: &dyn Executor) -> Result<BTreeMap<String, GitRemote>> {
        let names = self.run(exec, self.git.remote_list()).await?;
        let mut remotes = BTreeMap::new();
        for name in names.lines().filter(|name| !name.is_empty()) {
            if let Some(remote) = self.remote(exec, name).await? {
                remotes.insert(name.to_string(), remote);
            }
        }
        Ok(remotes)
    }

    /// Fetch and push URL of `name`, `None` if no such remote exists.
    pub(super) async fn remote(&self, exec: &dyn Executor, name: &str) -> Result<Option<GitRemote>> {
        let names = self.run(exec, self.git.remote_list()).await?;
        if !names.lines().any(|existing| existing == name) {
            return Ok(None);
        }
        let fetch_url = self.run(exec, self.git.remote_get_url(name, false)).await?;
        let push_url = self.run(exec, self.git.remote_get_url(name, true)).await?;
        Ok(Some(GitRemote {
            name: name.to_string(),
            fetch_url,
            push_url,
        }))
    }

    /// Add or retarget a remote and return it as git reports it afterwards.
    pub(super) async fn set_remote(
        &self,
        exec: &dyn Executor,
        name: &str,
        url: &str,
        push: bool,
        overwrite: bool,
    ) -> Result<GitRemote> {
        let url = chomp_protocol(url);
        let exists = self.remote(exec, name).await?.is_some();

        if exists && push {
            self.run(exec, self.git.remote_set_url(name, &url, true)).await?;
        } else if exists && overwrite {
            self.run(exec, self.git.remote_set_url(name, &url, false)).await?;
        } else {
            // Fails for an existing remote unless overwrite was requested
            self.run(exec, self.git.remote_add(name, &url)).await?;
            if push {
                self.run(exec, self.git.remote_set_url(name, &url, true)).await?;
            }
        }

        self.remote(exec, name).await?.ok_or_else(|| VcsError::RemoteSetFailed {
            name: name.to_string(),
        })
    }

    /// Make the working copy's remotes match the configured ones.
    ///
    /// Only differing URLs are written, so a second call with the same
    /// configuration only reads.
    pub(super) async fn set_remotes(&self, exec: &dyn Executor, overwrite: bool) -> Result<()> {
        for (name, wanted) in &self.remotes {
            let mut existing = self.remote(exec, name).await?;

            if existing.as_ref().is_none_or(|remote| remote.fetch_url != wanted.fetch_url) {
                tracing::debug!("Setting fetch url of remote {name} to {}", wanted.fetch_url);
                existing =
                    Some(self.set_remote(exec, name, &wanted.fetch_url, false, overwrite).await?);
            }

            if !wanted.push_url.is_empty()
                && existing.as_ref().is_none_or(|remote| remote.push_url != wanted.push_url)
            {
                tracing::debug!("Setting push url of remote {name} to {}", wanted.push_url);
                self.set_remote(exec, name, &wanted.push_url, true, overwrite).await?;
            }
        }
        Ok(())
    }
}

/// Parse `git version 2.39.2` (or `2.39.2.windows.1`, `2.40`) into a semver version.
pub(crate) fn parse_git_version(output: &str) -> Result<Version> {
    let malformed = || VcsError::Parse {
        what: "git version".to_string(),
        reason: format!("unexpected output '{output}'"),
    };
    let raw = output.trim().strip_prefix("git version ").ok_or_else(malformed)?;
    let raw = raw.split_whitespace().next().ok_or_else(malformed)?;
    let mut parts: Vec<&str> = raw.split('.').take(3).collect();
    while parts.len() < 3 {
        parts.push("0");
    }
    Ok(Version::parse(&parts.join("."))?)
}
