//! Mercurial request builders.

use std::path::{Path, PathBuf};

use crate::run::CommandRequest;
use crate::utils::platform::vcs_command;

/// Builds hg requests for one working copy.
#[derive(Debug, Clone)]
pub struct Hg {
    bin: String,
    path: PathBuf,
}

impl Hg {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            bin: vcs_command("hg"),
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

    fn command(&self) -> CommandRequest {
        CommandRequest::new(&self.bin).current_dir(&self.path)
    }

    /// `hg clone [--noupdate] [-q] <url> <path>`, run from the process directory.
    #[must_use]
    pub fn clone(&self, url: &str, no_update: bool, quiet: bool) -> CommandRequest {
        let mut request = CommandRequest::new(&self.bin).arg("clone");
        if no_update {
            request = request.arg("--noupdate");
        }
        if quiet {
            request = request.arg("-q");
        }
        request.arg(url).arg(self.path.display().to_string()).log_in_real_time(true)
    }

    #[must_use]
    pub fn update(&self, quiet: bool) -> CommandRequest {
        let request = self.command().arg("update");
        if quiet { request.arg("-q") } else { request }
    }

    #[must_use]
    pub fn pull(&self, update: bool) -> CommandRequest {
        let request = self.command().arg("pull");
        let request = if update { request.arg("--update") } else { request };
        request.log_in_real_time(true)
    }

    /// `hg parents --template=<template>`
    #[must_use]
    pub fn parents(&self, template: &str) -> CommandRequest {
        self.command().args(["parents".to_string(), format!("--template={template}")])
    }
}
