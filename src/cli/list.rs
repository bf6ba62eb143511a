//! `vcsync list`: show the configured repositories.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use serde::Serialize;

use super::{CliContext, OutputFormat};
use crate::config::SyncConfig;
use crate::sync::{ProjectRegistry, VcsKind};

#[derive(Args)]
pub struct ListCommand {
    #[arg(short, long, value_enum, default_value_t)]
    format: OutputFormat,
}

#[derive(Debug, Serialize)]
struct ListEntry {
    name: String,
    /// `None` when neither configured nor detectable from the url
    vcs: Option<String>,
    path: String,
    url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    rev: Option<String>,
    /// Whether the working copy has been checked out
    present: bool,
}

impl ListCommand {
    pub async fn execute(self, ctx: &CliContext) -> Result<()> {
        let config = SyncConfig::load(ctx.config_path.as_deref()).await?;
        let entries = collect_entries(&config, &ProjectRegistry::default())?;

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
            OutputFormat::Text if entries.is_empty() => println!("No repositories configured"),
            OutputFormat::Text => {
                for entry in &entries {
                    let marker = if entry.present {
                        "●".green()
                    } else {
                        "○".dimmed()
                    };
                    let vcs = entry.vcs.as_deref().unwrap_or("?");
                    let rev = entry.rev.as_deref().map(|rev| format!(" @ {rev}")).unwrap_or_default();
                    println!("{marker} {} [{vcs}] {}{rev}", entry.name.bold(), entry.url);
                    println!("    {}", entry.path.dimmed());
                }
            }
        }
        Ok(())
    }
}

fn collect_entries(config: &SyncConfig, registry: &ProjectRegistry) -> Result<Vec<ListEntry>> {
    config
        .repos
        .iter()
        .map(|(name, repo)| {
            let path = repo.resolved_path()?;
            let vcs = repo
                .vcs
                .clone()
                .or_else(|| registry.schemes().detect_one(&repo.url).ok().map(|kind| kind.to_string()));
            let present = vcs
                .as_deref()
                .and_then(|vcs| vcs.parse::<VcsKind>().ok())
                .is_some_and(|kind| path.join(kind.metadata_dir()).is_dir());
            Ok(ListEntry {
                name: name.clone(),
                vcs,
                path: path.display().to_string(),
                url: repo.url.clone(),
                rev: repo.rev.clone(),
                present,
            })
        })
        .collect()
}
