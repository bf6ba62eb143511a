//! `vcsync sync`: clone or update configured repositories.
//!
//! Repositories are selected by name or glob pattern and updated concurrently,
//! at most `max_parallel` at a time. Each gets a spinner showing the VCS's own
//! progress output. The command fails when any repository errors or ends in a
//! recovered failure.

use anyhow::{Result, anyhow};
use clap::Args;
use colored::Colorize;
use futures::{StreamExt, stream};
use std::collections::BTreeMap;
use std::sync::Arc;
use strsim::levenshtein;

use super::CliContext;
use crate::config::{RepoConfig, SyncConfig};
use crate::run::ProgressCallback;
use crate::sync::{ProjectRegistry, UpdateOutcome};
use crate::utils::platform::require_binary;
use crate::utils::progress::{MultiProgress, ProgressBar};

#[derive(Args)]
pub struct SyncCommand {
    /// Repository names or glob patterns; all repositories when omitted
    #[arg(value_name = "PATTERN")]
    patterns: Vec<String>,

    /// Repositories updated at the same time [default: settings.max_parallel]
    #[arg(short = 'j', long)]
    max_parallel: Option<usize>,

    /// Reconcile git remotes with the configuration before updating
    #[arg(long)]
    set_remotes: bool,
}

impl SyncCommand {
    pub async fn execute(self, ctx: &CliContext) -> Result<()> {
        let config = SyncConfig::load(ctx.config_path.as_deref()).await?;
        let selected = select_repos(&config.repos, &self.patterns)?;
        if selected.is_empty() {
            if !ctx.quiet {
                println!("No repositories configured");
            }
            return Ok(());
        }

        let max_parallel = self.max_parallel.unwrap_or(config.settings.max_parallel).max(1);
        tracing::debug!("Synchronizing {} repositories, {max_parallel} at a time", selected.len());

        let registry = ProjectRegistry::default();
        let multi = if ctx.no_progress {
            MultiProgress::hidden()
        } else {
            MultiProgress::new()
        };
        let set_remotes = self.set_remotes;

        let registry = &registry;
        let multi = &multi;
        let mut results: Vec<(&str, Result<UpdateOutcome>)> = stream::iter(selected)
            .map(|(name, repo)| async move {
                let bar = multi.add_spinner(name);
                let result = sync_repo(registry, repo, &bar, set_remotes).await;
                match &result {
                    Ok(outcome) => bar.finish_with_message(outcome.to_string()),
                    Err(_) => bar.finish_with_message("failed"),
                }
                (name, result)
            })
            .buffer_unordered(max_parallel)
            .collect()
            .await;
        results.sort_by(|a, b| a.0.cmp(b.0));

        let total = results.len();
        let mut failed = 0;
        for (name, result) in &results {
            match result {
                Ok(outcome) if outcome.is_recovered() => {
                    failed += 1;
                    eprintln!("{} {name}: {outcome}", "!".yellow().bold());
                }
                Ok(outcome) => {
                    if !ctx.quiet {
                        println!("{} {name}: {outcome}", "✓".green());
                    }
                }
                Err(err) => {
                    failed += 1;
                    eprintln!("{} {name}: {err:#}", "✗".red().bold());
                }
            }
        }

        if failed > 0 {
            return Err(anyhow!("{failed} of {total} repositories failed to synchronize"));
        }
        Ok(())
    }
}

async fn sync_repo(
    registry: &ProjectRegistry,
    repo: &RepoConfig,
    bar: &ProgressBar,
    set_remotes: bool,
) -> Result<UpdateOutcome> {
    let progress: ProgressCallback = {
        let bar = bar.clone();
        Arc::new(move |chunk: &str, _| bar.set_chunk(chunk))
    };
    let options = repo.project_options(Some(progress))?;
    let project = registry.create_async(options, repo.vcs.as_deref())?;
    require_binary(project.kind().as_str())?;
    bar.set_message(format!("{} {}", project.kind(), project.url()));
    Ok(project.update_repo(set_remotes).await?)
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

/// Repositories whose names match any of `patterns`, in name order.
///
/// An empty pattern list selects everything. A pattern matching nothing is
/// an error that suggests close names.
fn select_repos<'a>(
    repos: &'a BTreeMap<String, RepoConfig>,
    patterns: &[String],
) -> Result<Vec<(&'a str, &'a RepoConfig)>> {
    if patterns.is_empty() {
        return Ok(repos.iter().map(|(name, repo)| (name.as_str(), repo)).collect());
    }

    let mut selected = BTreeMap::new();
    for pattern in patterns {
        if is_glob(pattern) {
            let glob = glob::Pattern::new(pattern)
                .map_err(|e| anyhow!("Invalid pattern '{pattern}': {e}"))?;
            let mut matched = false;
            for (name, repo) in repos.iter().filter(|(name, _)| glob.matches(name)) {
                matched = true;
                selected.insert(name.as_str(), repo);
            }
            if !matched {
                anyhow::bail!("No repository matches '{pattern}'");
            }
        } else if let Some((name, repo)) = repos.get_key_value(pattern) {
            selected.insert(name.as_str(), repo);
        } else {
            let suggestions = similar_names(pattern, repos.keys());
            if suggestions.is_empty() {
                anyhow::bail!("Unknown repository '{pattern}'");
            }
            anyhow::bail!("Unknown repository '{pattern}'. Did you mean: {}?", suggestions.join(", "));
        }
    }
    Ok(selected.into_iter().collect())
}

/// Up to three names within a third of `target`'s length in edit distance.
fn similar_names<'a>(target: &str, names: impl Iterator<Item = &'a String>) -> Vec<&'a str> {
    let threshold = (target.len() / 3).max(2);
    let mut scored: Vec<_> = names
        .map(|name| (levenshtein(target, name), name.as_str()))
        .filter(|(distance, _)| *distance <= threshold)
        .collect();
    scored.sort();
    scored.into_iter().take(3).map(|(_, name)| name).collect()
}
