//! Common helpers for the vcsync integration tests

// Not every helper is used by every test module
#![allow(dead_code)]

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Output of one `vcsync` invocation.
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub success: bool,
    pub code: Option<i32>,
}

/// Run the `vcsync` binary with progress and colors disabled.
pub fn run_vcsync(config: &Path, args: &[&str]) -> Result<CommandOutput> {
    let output = Command::new(env!("CARGO_BIN_EXE_vcsync"))
        .arg("--config")
        .arg(config)
        .arg("--no-progress")
        .args(args)
        .env("NO_COLOR", "1")
        .env_remove("RUST_LOG")
        .output()
        .context("Failed to run vcsync")?;

    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        success: output.status.success(),
        code: output.status.code(),
    })
}

/// A configuration file listing git repositories as `(name, url, path)`.
pub struct ConfigBuilder {
    repos: Vec<(String, String, PathBuf, Option<String>)>,
    max_parallel: Option<usize>,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            repos: Vec::new(),
            max_parallel: None,
        }
    }

    pub fn max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = Some(max_parallel);
        self
    }

    pub fn git_repo(mut self, name: &str, url: &str, path: &Path) -> Self {
        self.repos.push((name.to_string(), url.to_string(), path.to_path_buf(), None));
        self
    }

    pub fn git_repo_at(mut self, name: &str, url: &str, path: &Path, rev: &str) -> Self {
        self.repos.push((name.to_string(), url.to_string(), path.to_path_buf(), Some(rev.to_string())));
        self
    }

    pub fn to_toml(&self) -> String {
        let mut out = String::new();
        if let Some(max_parallel) = self.max_parallel {
            out.push_str(&format!("[settings]\nmax_parallel = {max_parallel}\n\n"));
        }
        for (name, url, path, rev) in &self.repos {
            out.push_str(&format!("[repos.{name}]\n"));
            out.push_str(&format!("path = '{}'\n", path.display()));
            out.push_str(&format!("url = '{url}'\n"));
            out.push_str("vcs = 'git'\n");
            if let Some(rev) = rev {
                out.push_str(&format!("rev = '{rev}'\n"));
            }
            out.push('\n');
        }
        out
    }

    pub fn write_to(&self, path: &Path) -> Result<PathBuf> {
        std::fs::write(path, self.to_toml())
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(path.to_path_buf())
    }
}
