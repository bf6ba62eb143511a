//! Git test helper utilities
//!
//! Drives the git CLI directly, independent of the crate's own runner, so
//! tests can arrange repository state and check what a synchronizer did.

use anyhow::{Context, Result, bail};
use std::path::{Path, PathBuf};
use std::process::Command;

/// A git repository under test.
pub struct TestGit {
    repo_path: PathBuf,
}

impl TestGit {
    pub fn new(repo_path: impl Into<PathBuf>) -> Self {
        Self {
            repo_path: repo_path.into(),
        }
    }

    /// Run git with `args` in the repository and return trimmed stdout.
    pub fn run(&self, args: &[&str]) -> Result<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.repo_path)
            .output()
            .with_context(|| format!("Failed to spawn git {}", args.join(" ")))?;

        if !output.status.success() {
            bail!("git {} failed: {}", args.join(" "), String::from_utf8_lossy(&output.stderr));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// Initialize a repository whose first branch is `master`.
    pub fn init(&self) -> Result<()> {
        std::fs::create_dir_all(&self.repo_path)?;
        self.run(&["init", "--quiet"])?;
        self.run(&["symbolic-ref", "HEAD", "refs/heads/master"])?;
        Ok(())
    }

    pub fn init_bare(&self) -> Result<()> {
        std::fs::create_dir_all(&self.repo_path)?;
        self.run(&["init", "--bare", "--quiet"])?;
        self.run(&["symbolic-ref", "HEAD", "refs/heads/master"])?;
        Ok(())
    }

    pub fn config_user(&self) -> Result<()> {
        self.run(&["config", "user.email", "test@vcsync.example"])?;
        self.run(&["config", "user.name", "Test User"])?;
        Ok(())
    }

    pub fn write_file(&self, name: &str, content: &str) -> Result<()> {
        let path = self.repo_path.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))
    }

    pub fn read_file(&self, name: &str) -> Result<String> {
        let path = self.repo_path.join(name);
        std::fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))
    }

    pub fn add_all(&self) -> Result<()> {
        self.run(&["add", "."])?;
        Ok(())
    }

    pub fn commit(&self, message: &str) -> Result<()> {
        self.run(&["commit", "--quiet", "-m", message])?;
        Ok(())
    }

    /// Write `name`, commit everything and return the new HEAD.
    pub fn commit_file(&self, name: &str, content: &str, message: &str) -> Result<String> {
        self.write_file(name, content)?;
        self.add_all()?;
        self.commit(message)?;
        self.rev_parse_head()
    }

    pub fn tag(&self, tag_name: &str) -> Result<()> {
        self.run(&["tag", tag_name])?;
        Ok(())
    }

    pub fn checkout(&self, ref_name: &str) -> Result<()> {
        self.run(&["checkout", "--quiet", ref_name])?;
        Ok(())
    }

    pub fn remote_add(&self, name: &str, url: &str) -> Result<()> {
        self.run(&["remote", "add", name, url])?;
        Ok(())
    }

    pub fn remote_get_url(&self, name: &str, push: bool) -> Result<String> {
        if push {
            self.run(&["remote", "get-url", "--push", name])
        } else {
            self.run(&["remote", "get-url", name])
        }
    }

    pub fn push(&self, remote: &str, refspec: &str) -> Result<()> {
        self.run(&["push", "--quiet", remote, refspec])?;
        Ok(())
    }

    pub fn rev_parse_head(&self) -> Result<String> {
        self.run(&["rev-parse", "HEAD"])
    }

    pub fn current_branch(&self) -> Result<String> {
        self.run(&["symbolic-ref", "--short", "HEAD"])
    }

    pub fn status_porcelain(&self) -> Result<String> {
        self.run(&["status", "--porcelain"])
    }

    pub fn stash_list(&self) -> Result<String> {
        self.run(&["stash", "list"])
    }
}
