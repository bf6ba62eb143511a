//! Parser for `git status -sb --porcelain=2`.

use serde::Serialize;

use crate::core::{Result, VcsError};

/// Branch header of a porcelain v2 status.
///
/// Only the `# branch.*` lines are read; changed-file entries are ignored.
/// When `branch_ab` is present both `branch_ahead` and `branch_behind` are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GitStatus {
    /// Commit of HEAD; `None` for an unborn branch
    pub branch_oid: Option<String>,
    /// Branch name, or `(detached)`
    pub branch_head: Option<String>,
    pub branch_upstream: Option<String>,
    /// Raw `+N -M` notation
    pub branch_ab: Option<String>,
    pub branch_ahead: Option<u64>,
    pub branch_behind: Option<u64>,
}

impl GitStatus {
    /// Parse the output of `git status -sb --porcelain=2`.
    ///
    /// ```rust
    /// use vcsync::sync::git::GitStatus;
    ///
    /// let output = concat!(
    ///     "# branch.oid d4ccd4d6af04b53949f89fbf0cdae13719dc5a08\n",
    ///     "# branch.head master\n",
    ///     "# branch.upstream origin/master\n",
    ///     "# branch.ab +1 -2\n",
    /// );
    /// let status = GitStatus::from_porcelain(output)?;
    /// assert_eq!(status.branch_head.as_deref(), Some("master"));
    /// assert_eq!(status.branch_ahead, Some(1));
    /// assert_eq!(status.branch_behind, Some(2));
    /// # Ok::<(), vcsync::core::VcsError>(())
    /// ```
    ///
    /// # Errors
    ///
    /// [`VcsError::Parse`] when there is no branch header or the ahead/behind
    /// pair is not numeric.
    pub fn from_porcelain(output: &str) -> Result<Self> {
        let mut status = Self::default();
        let mut saw_header = false;

        for line in output.lines() {
            let Some(header) = line.trim().strip_prefix("# branch.") else {
                continue;
            };
            saw_header = true;
            let (key, value) = header.split_once(' ').unwrap_or((header, ""));
            let value = value.trim();
            match key {
                "oid" if value != "(initial)" && !value.is_empty() => {
                    status.branch_oid = Some(value.to_string());
                }
                "head" if !value.is_empty() => status.branch_head = Some(value.to_string()),
                "upstream" if !value.is_empty() => {
                    status.branch_upstream = Some(value.to_string());
                }
                "ab" => {
                    let (ahead, behind) = parse_ahead_behind(value)?;
                    status.branch_ab = Some(value.to_string());
                    status.branch_ahead = Some(ahead);
                    status.branch_behind = Some(behind);
                }
                _ => {}
            }
        }

        if !saw_header {
            return Err(VcsError::Parse {
                what: "git status".to_string(),
                reason: "no branch header in porcelain output".to_string(),
            });
        }
        Ok(status)
    }

    /// Remote part of the upstream, e.g. `origin` for `origin/master`.
    #[must_use]
    pub fn upstream_remote(&self) -> Option<&str> {
        self.branch_upstream
            .as_deref()
            .and_then(|upstream| upstream.split_once('/'))
            .map(|(remote, _)| remote)
    }
}

fn parse_ahead_behind(value: &str) -> Result<(u64, u64)> {
    let malformed = || VcsError::Parse {
        what: "git status".to_string(),
        reason: format!("malformed ahead/behind '{value}'"),
    };
    let mut parts = value.split_whitespace();
    let ahead = parts.next().and_then(|part| part.strip_prefix('+')).ok_or_else(malformed)?;
    let behind = parts.next().and_then(|part| part.strip_prefix('-')).ok_or_else(malformed)?;
    if parts.next().is_some() {
        return Err(malformed());
    }
    Ok((ahead.parse().map_err(|_| malformed())?, behind.parse().map_err(|_| malformed())?))
}
