//! Subversion request builders.

use std::path::{Path, PathBuf};

use crate::run::CommandRequest;
use crate::utils::platform::vcs_command;

/// Options shared by `svn checkout` and `svn update`.
///
/// Both commands always run with `--non-interactive` so a credential prompt
/// fails instead of hanging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SvnOptions {
    pub username: Option<String>,
    pub password: Option<String>,
    /// Revision passed with `-r`
    pub revision: Option<String>,
    /// Accept the server certificate without verification
    pub trust_server_cert: bool,
    pub quiet: bool,
}

impl SvnOptions {
    fn apply(&self, mut request: CommandRequest) -> CommandRequest {
        request = request.arg("--non-interactive");
        if self.quiet {
            request = request.arg("--quiet");
        }
        if let Some(username) = &self.username {
            request = request.args(["--username", username]);
        }
        if let Some(password) = &self.password {
            request = request.args(["--password", password]);
        }
        if let Some(revision) = &self.revision {
            request = request.args(["-r", revision]);
        }
        if self.trust_server_cert {
            request = request.arg("--trust-server-cert");
        }
        request
    }
}

/// Builds svn requests for one working copy.
#[derive(Debug, Clone)]
pub struct Svn {
    bin: String,
    path: PathBuf,
}

impl Svn {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            bin: vcs_command("svn"),
            path: path.into(),
        }
    }

    #[must_use]
    pub fn with_binary(mut self, bin: impl Into<String>) -> Self {
        self.bin = bin.into();
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `svn checkout <options> <url> <path>`, run from the process directory.
    #[must_use]
    pub fn checkout(&self, url: &str, options: &SvnOptions) -> CommandRequest {
        let request = options.apply(CommandRequest::new(&self.bin).arg("checkout"));
        request.arg(url).arg(self.path.display().to_string()).log_in_real_time(true)
    }

    /// `svn update <options>` inside the working copy.
    #[must_use]
    pub fn update(&self, options: &SvnOptions) -> CommandRequest {
        options
            .apply(CommandRequest::new(&self.bin).current_dir(&self.path).arg("update"))
            .log_in_real_time(true)
    }

    /// `svn info --xml` for the working copy root.
    #[must_use]
    pub fn info_xml(&self) -> CommandRequest {
        CommandRequest::new(&self.bin).current_dir(&self.path).args(["info", "--xml"])
    }
}
