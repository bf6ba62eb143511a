//! `vcsync status`: branch, upstream and ahead/behind counts of a git
//! working copy.

use anyhow::{Result, bail};
use clap::Args;
use colored::Colorize;
use std::path::PathBuf;

use super::{CliContext, OutputFormat, open_working_copy};
use crate::sync::AsyncProject;
use crate::sync::git::GitStatus;

#[derive(Args)]
pub struct StatusCommand {
    /// Working copy to inspect
    path: PathBuf,

    #[arg(short, long, value_enum, default_value_t)]
    format: OutputFormat,
}

impl StatusCommand {
    pub async fn execute(self, _ctx: &CliContext) -> Result<()> {
        let AsyncProject::Git(repo) = open_working_copy(&self.path)? else {
            bail!("status is only available for git working copies");
        };
        let status = repo.status().await?;
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
            OutputFormat::Text => print!("{}", render_text(&status)),
        }
        Ok(())
    }
}

fn render_text(status: &GitStatus) -> String {
    let mut out = String::new();
    let head = status.branch_head.as_deref().unwrap_or("(detached)");
    out.push_str(&format!("{} {}\n", "branch".bold(), head));
    if let Some(oid) = &status.branch_oid {
        out.push_str(&format!("{} {oid}\n", "commit".bold()));
    }
    match &status.branch_upstream {
        Some(upstream) => {
            out.push_str(&format!("{} {upstream}\n", "upstream".bold()));
            let ahead = status.branch_ahead.unwrap_or(0);
            let behind = status.branch_behind.unwrap_or(0);
            let state = match (ahead, behind) {
                (0, 0) => "up to date".green().to_string(),
                (a, 0) => format!("ahead {a}").yellow().to_string(),
                (0, b) => format!("behind {b}").yellow().to_string(),
                (a, b) => format!("ahead {a}, behind {b}").red().to_string(),
            };
            out.push_str(&format!("{} {state}\n", "state".bold()));
        }
        None => out.push_str(&format!("{} none\n", "upstream".bold())),
    }
    out
}
