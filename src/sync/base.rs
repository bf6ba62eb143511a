//! State shared by every repository handle.

use std::path::{Path, PathBuf};
use tracing::Span;

use crate::core::Result;

/// Url, working copy path and requested revision of one repository.
///
/// Every command a handle runs happens inside [`SyncBase::span`], so log
/// lines carry the VCS binary and the repository name.
#[derive(Debug, Clone)]
pub struct SyncBase {
    bin_name: &'static str,
    url: String,
    path: PathBuf,
    rev: Option<String>,
    span: Span,
}

impl SyncBase {
    pub fn new(
        bin_name: &'static str,
        url: impl Into<String>,
        path: impl Into<PathBuf>,
        rev: Option<String>,
    ) -> Self {
        let path = path.into();
        let name = repo_name(&path);
        Self {
            bin_name,
            url: url.into(),
            path,
            rev: rev.filter(|rev| !rev.is_empty()),
            span: tracing::info_span!("repo", bin = bin_name, name = %name),
        }
    }

    #[must_use]
    pub const fn bin_name(&self) -> &'static str {
        self.bin_name
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn rev(&self) -> Option<&str> {
        self.rev.as_deref()
    }

    /// Final path component without its extension.
    #[must_use]
    pub fn repo_name(&self) -> String {
        repo_name(&self.path)
    }

    #[must_use]
    pub const fn span(&self) -> &Span {
        &self.span
    }

    /// Whether the working copy has its VCS metadata directory (`.git`, `.hg`, `.svn`).
    #[must_use]
    pub fn has_metadata(&self, dir: &str) -> bool {
        self.path.join(dir).is_dir()
    }

    /// Create the working copy directory and its parents.
    ///
    /// # Errors
    ///
    /// Propagates the I/O error when the directory cannot be created.
    pub fn ensure_dir(&self) -> Result<()> {
        if self.path.exists() {
            return Ok(());
        }
        tracing::debug!(
            "Project directory for {} does not exist @ {}",
            self.repo_name(),
            self.path.display()
        );
        std::fs::create_dir_all(&self.path)?;
        Ok(())
    }
}

fn repo_name(path: &Path) -> String {
    path.file_stem().map(|stem| stem.to_string_lossy().into_owned()).unwrap_or_default()
}
