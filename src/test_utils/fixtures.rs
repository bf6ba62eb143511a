//! Repository fixtures
//!
//! [`RemoteFixture`] is a bare repository with a seed working copy that
//! publishes commits to it, standing in for a hosted upstream.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use super::git_helper::TestGit;

pub const README: &str = "README.md";

/// A bare `origin` plus the working copy used to push to it.
pub struct RemoteFixture {
    temp: TempDir,
    bare: PathBuf,
    seed: TestGit,
}

impl RemoteFixture {
    /// A bare repository on `master` with one commit adding [`README`].
    pub fn new() -> Result<Self> {
        let temp = TempDir::new()?;
        let bare = temp.path().join("remote.git");
        TestGit::new(&bare).init_bare()?;

        let seed = TestGit::new(temp.path().join("seed"));
        seed.init()?;
        seed.config_user()?;
        seed.commit_file(README, "first line\n", "Initial commit")?;
        seed.remote_add("origin", &bare.display().to_string())?;
        seed.push("origin", "master")?;

        Ok(Self {
            temp,
            bare,
            seed,
        })
    }

    /// Url of the bare repository as git accepts it.
    pub fn url(&self) -> String {
        self.bare.display().to_string()
    }

    pub fn bare_path(&self) -> &Path {
        &self.bare
    }

    /// Scratch location for a working copy, not created.
    pub fn checkout_path(&self, name: &str) -> PathBuf {
        self.temp.path().join(name)
    }

    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    pub fn seed(&self) -> &TestGit {
        &self.seed
    }

    /// Commit `content` to `name` on master and push it; returns the new sha.
    pub fn push_commit(&self, name: &str, content: &str, message: &str) -> Result<String> {
        let sha = self.seed.commit_file(name, content, message)?;
        self.seed.push("origin", "master")?;
        Ok(sha)
    }

    /// Tag the seed's HEAD and push the tag.
    pub fn push_tag(&self, tag: &str) -> Result<String> {
        self.seed.tag(tag)?;
        self.seed.push("origin", tag)?;
        self.seed.rev_parse_head()
    }
}
