//! Repository list configuration
//!
//! `vcsync` reads the repositories it manages from one file, TOML by default
//! or YAML when the extension says so:
//!
//! ```toml
//! [settings]
//! max_parallel = 4
//!
//! [repos.libvcs]
//! path = "~/code/libvcs"
//! url = "git+https://github.com/vcs-python/libvcs"
//! rev = "master"
//!
//! [repos.libvcs.remotes]
//! upstream = "https://github.com/vcs-python/libvcs"
//! mirror = { fetch_url = "https://mirror.example/libvcs", push_url = "git@mirror.example:libvcs" }
//! ```
//!
//! Location: `--config`, then `VCSYNC_CONFIG`, then `~/.vcsync/config.toml`.
//! Paths expand `~` and environment variables.

pub mod parser;

pub use parser::{ConfigFormat, parse_config, parse_config_str};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::constants::DEFAULT_MAX_PARALLEL;
use crate::core::VcsError;
use crate::run::ProgressCallback;
use crate::sync::git::GitRemote;
use crate::sync::svn::SvnAuth;
use crate::sync::{ProjectOptions, ProjectRegistry};
use crate::utils::platform::{get_home_dir, resolve_path};

const fn default_max_parallel() -> usize {
    DEFAULT_MAX_PARALLEL
}

const fn default_true() -> bool {
    true
}

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncConfig {
    #[serde(default)]
    pub settings: Settings,
    /// Repositories keyed by a short name used on the command line
    #[serde(default)]
    pub repos: BTreeMap<String, RepoConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Repositories synchronized at the same time
    #[serde(default = "default_max_parallel")]
    pub max_parallel: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            max_parallel: DEFAULT_MAX_PARALLEL,
        }
    }
}

/// One managed repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoConfig {
    pub path: String,
    pub url: String,
    /// `git`, `hg` or `svn`; detected from the url when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vcs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    /// Extra git remotes; `origin` defaults to `url`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub remotes: BTreeMap<String, RemoteConfig>,
    #[serde(default)]
    pub shallow: bool,
    #[serde(default = "default_true")]
    pub tls_verify: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub trust_server_cert: bool,
}

/// A remote given either as one url or as separate fetch and push urls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RemoteConfig {
    Url(String),
    Split { fetch_url: String, push_url: String },
}

impl RemoteConfig {
    fn to_remote(&self, name: &str) -> GitRemote {
        match self {
            Self::Url(url) => GitRemote::new(name, url.clone()),
            Self::Split {
                fetch_url,
                push_url,
            } => GitRemote {
                name: name.to_string(),
                fetch_url: fetch_url.clone(),
                push_url: push_url.clone(),
            },
        }
    }
}

impl RepoConfig {
    /// Working copy path with `~` and variables expanded.
    pub fn resolved_path(&self) -> Result<PathBuf> {
        resolve_path(&self.path)
    }

    /// Handle options for this repository.
    pub fn project_options(&self, progress: Option<ProgressCallback>) -> Result<ProjectOptions> {
        let mut options = ProjectOptions::new(self.url.clone(), self.resolved_path()?);
        options.rev.clone_from(&self.rev);
        options.remotes =
            self.remotes.iter().map(|(name, remote)| (name.clone(), remote.to_remote(name))).collect();
        options.progress = progress;
        options.git_shallow = self.shallow;
        options.tls_verify = self.tls_verify;
        options.svn_auth = SvnAuth {
            username: self.username.clone(),
            password: self.password.clone(),
            trust_server_cert: self.trust_server_cert,
        };
        Ok(options)
    }
}

impl SyncConfig {
    /// `~/.vcsync/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        Ok(get_home_dir()?.join(".vcsync").join("config.toml"))
    }

    /// Load from `path`, or from the default location when `None`.
    ///
    /// A missing default file yields an empty configuration; a missing
    /// explicit file is an error.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path).await,
            None => {
                let path = Self::default_path()?;
                if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                    Self::load_from(&path).await
                } else {
                    tracing::debug!("No configuration at {}, using an empty one", path.display());
                    Ok(Self::default())
                }
            }
        }
    }

    /// Load and validate a configuration file.
    pub async fn load_from(path: &Path) -> Result<Self> {
        let config: Self = parse_config(path).await?;
        config
            .validate(&ProjectRegistry::default())
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    /// Check every repository entry.
    ///
    /// # Errors
    ///
    /// [`VcsError::Config`] naming the first entry with an empty path or url,
    /// or with a `vcs` the registry does not know.
    pub fn validate(&self, registry: &ProjectRegistry) -> crate::core::Result<()> {
        if self.settings.max_parallel == 0 {
            return Err(VcsError::Config {
                message: "settings.max_parallel must be at least 1".to_string(),
            });
        }
        for (name, repo) in &self.repos {
            if repo.path.trim().is_empty() {
                return Err(VcsError::Config {
                    message: format!("repository '{name}' has an empty path"),
                });
            }
            if repo.url.trim().is_empty() {
                return Err(VcsError::Config {
                    message: format!("repository '{name}' has an empty url"),
                });
            }
            if let Some(vcs) = &repo.vcs
                && !registry.is_registered(vcs)
            {
                return Err(VcsError::Config {
                    message: format!("repository '{name}' uses unsupported vcs '{vcs}'"),
                });
            }
        }
        Ok(())
    }

    /// The repository named `name`.
    pub fn repo(&self, name: &str) -> Option<&RepoConfig> {
        self.repos.get(name)
    }
}
