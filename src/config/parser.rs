//! Format-aware configuration parsing.
//!
//! The file extension picks the format: `.yaml` and `.yml` are YAML,
//! everything else is TOML. Errors carry the file path as context.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::Path;

/// Serialization format of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Yaml,
}

impl ConfigFormat {
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
                Self::Yaml
            }
            _ => Self::Toml,
        }
    }
}

/// Deserialize `content` in the given format.
///
/// # Errors
///
/// [`VcsError::Toml`](crate::core::VcsError::Toml) or
/// [`VcsError::Yaml`](crate::core::VcsError::Yaml) on malformed input.
pub fn parse_config_str<T>(content: &str, format: ConfigFormat) -> crate::core::Result<T>
where
    T: DeserializeOwned,
{
    Ok(match format {
        ConfigFormat::Toml => toml::from_str(content)?,
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
    })
}

/// Read and deserialize a configuration file.
///
/// ```rust,no_run
/// use vcsync::config::{SyncConfig, parse_config};
/// use std::path::Path;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config: SyncConfig = parse_config(Path::new("repos.yaml")).await?;
/// println!("{} repositories", config.repos.len());
/// # Ok(())
/// # }
/// ```
pub async fn parse_config<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned,
{
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    parse_config_str(&content, ConfigFormat::from_path(path))
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}
