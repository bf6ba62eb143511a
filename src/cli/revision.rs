//! `vcsync revision`: print the revision a working copy is at.

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::{CliContext, open_working_copy};

#[derive(Args)]
pub struct RevisionCommand {
    /// Working copy to inspect
    path: PathBuf,
}

impl RevisionCommand {
    pub async fn execute(self, _ctx: &CliContext) -> Result<()> {
        let project = open_working_copy(&self.path)?;
        let revision = project.get_revision().await?;
        tracing::debug!("{} working copy at {}", project.kind(), project.path().display());
        println!("{revision}");
        Ok(())
    }
}
