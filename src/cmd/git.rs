//! Git request builders.

use std::path::{Path, PathBuf};

use crate::run::CommandRequest;
use crate::utils::platform::vcs_command;

/// Options for `git clone`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloneOptions {
    /// Create a shallow clone with `--depth 1`
    pub shallow: bool,
    /// When false, pass `-c http.sslVerify=false`
    pub tls_verify: bool,
}

impl Default for CloneOptions {
    fn default() -> Self {
        Self {
            shallow: false,
            tls_verify: true,
        }
    }
}

/// Builds git requests for one working copy.
///
/// Every request except [`clone`](Self::clone) and [`version`](Self::version)
/// runs with the working copy as its current directory.
#[derive(Debug, Clone)]
pub struct Git {
    bin: String,
    path: PathBuf,
}

impl Git {
    /// Builder for the working copy at `path`, using `git` from `PATH`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            bin: vcs_command("git"),
            path: path.into(),
        }
    }

    /// Use a specific git executable.
    #[must_use]
    pub fn with_binary(mut self, bin: impl Into<String>) -> Self {
        self.bin = bin.into();
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn command(&self) -> CommandRequest {
        CommandRequest::new(&self.bin).current_dir(&self.path)
    }

    /// `git clone --progress [--depth 1] [-c http.sslVerify=false] <url> <path>`
    ///
    /// Runs from the process directory so relative paths resolve the same way
    /// the caller sees them.
    #[must_use]
    pub fn clone(&self, url: &str, options: &CloneOptions) -> CommandRequest {
        let mut request = CommandRequest::new(&self.bin).args(["clone", "--progress"]);
        if options.shallow {
            request = request.args(["--depth", "1"]);
        }
        if !options.tls_verify {
            request = request.args(["-c", "http.sslVerify=false"]);
        }
        request.arg(url).arg(self.path.display().to_string())
    }

    #[must_use]
    pub fn fetch(&self) -> CommandRequest {
        self.command().arg("fetch")
    }

    #[must_use]
    pub fn checkout(&self, reference: &str) -> CommandRequest {
        self.command().args(["checkout", reference])
    }

    /// Porcelain status of tracked files only; empty output means clean.
    #[must_use]
    pub fn status_porcelain(&self) -> CommandRequest {
        self.command().args(["status", "--porcelain", "--untracked-files=no"])
    }

    /// `git status -sb --porcelain=2`, parsed by
    /// [`GitStatus`](crate::sync::git::GitStatus).
    #[must_use]
    pub fn status_branch(&self) -> CommandRequest {
        self.command().args(["status", "-sb", "--porcelain=2"])
    }

    #[must_use]
    pub fn rebase(&self, upstream: &str) -> CommandRequest {
        self.command().args(["rebase", upstream])
    }

    #[must_use]
    pub fn rebase_abort(&self) -> CommandRequest {
        self.command().args(["rebase", "--abort"])
    }

    /// `git reset --hard --quiet [commit]`
    #[must_use]
    pub fn reset_hard(&self, commit: Option<&str>) -> CommandRequest {
        let request = self.command().args(["reset", "--hard", "--quiet"]);
        match commit {
            Some(commit) => request.arg(commit),
            None => request,
        }
    }

    /// Hash of the first commit reachable from `reference`.
    #[must_use]
    pub fn rev_list_one(&self, reference: &str) -> CommandRequest {
        self.command().args(["rev-list", "--max-count=1", reference])
    }

    #[must_use]
    pub fn rev_parse_verify(&self, reference: &str) -> CommandRequest {
        self.command().args(["rev-parse", "--verify", reference])
    }

    /// `git show-ref <pattern>`; a missing ref exits 1, so the code is not checked.
    #[must_use]
    pub fn show_ref(&self, pattern: &str) -> CommandRequest {
        self.command().args(["show-ref", pattern]).check_returncode(false)
    }

    #[must_use]
    pub fn symbolic_ref_short(&self) -> CommandRequest {
        self.command().args(["symbolic-ref", "--short", "HEAD"])
    }

    #[must_use]
    pub fn stash_save(&self) -> CommandRequest {
        self.command().args(["stash", "save", "--quiet"])
    }

    /// `git stash pop [--index] --quiet`
    #[must_use]
    pub fn stash_pop(&self, index: bool) -> CommandRequest {
        let request = self.command().args(["stash", "pop"]);
        let request = if index { request.arg("--index") } else { request };
        request.arg("--quiet")
    }

    #[must_use]
    pub fn submodule_init(&self) -> CommandRequest {
        self.command().args(["submodule", "init"])
    }

    #[must_use]
    pub fn submodule_update(&self) -> CommandRequest {
        self.command().args(["submodule", "update", "--recursive", "--init"])
    }

    /// Remote names, one per line.
    #[must_use]
    pub fn remote_list(&self) -> CommandRequest {
        self.command().arg("remote")
    }

    #[must_use]
    pub fn remote_get_url(&self, name: &str, push: bool) -> CommandRequest {
        let request = self.command().args(["remote", "get-url"]);
        let request = if push { request.arg("--push") } else { request };
        request.arg(name)
    }

    #[must_use]
    pub fn remote_add(&self, name: &str, url: &str) -> CommandRequest {
        self.command().args(["remote", "add", name, url])
    }

    #[must_use]
    pub fn remote_set_url(&self, name: &str, url: &str, push: bool) -> CommandRequest {
        let request = self.command().args(["remote", "set-url"]);
        let request = if push { request.arg("--push") } else { request };
        request.args([name, url])
    }

    /// `git config --get <key>`; an unset key exits 1.
    #[must_use]
    pub fn config_get(&self, key: &str) -> CommandRequest {
        self.command().args(["config", "--get", key])
    }

    #[must_use]
    pub fn version(&self) -> CommandRequest {
        CommandRequest::new(&self.bin).arg("version")
    }
}
