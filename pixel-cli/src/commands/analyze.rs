//! Analyze command - run only the analyzer role

use std::path::PathBuf;

use clap::Args;
use pixel_core::{MigrationTeam, ProjectInventory, SettingsOverrides};

use super::Context;

/// Arguments for the analyze command
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Path to the Next.js project
    #[arg(long)]
    pub repo: PathBuf,

    /// Record the analysis in this session
    #[arg(long)]
    pub session_id: Option<String>,
}

impl AnalyzeArgs {
    /// Execute the analyze command
    pub async fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        if !self.repo.exists() {
            println!("Error: path does not exist: {}", self.repo.display());
            return Ok(());
        }

        let settings = ctx.settings(SettingsOverrides::default())?;
        let inventory = ProjectInventory::scan(&self.repo)?;
        let team = MigrationTeam::build(&ctx.store, &settings, self.session_id.clone()).await?;

        println!(
            "Analyzing {} ({} files, {})",
            self.repo.display(),
            inventory.files.len(),
            inventory.router
        );
        println!();

        let analysis = team.analyze(&inventory).await?;
        println!("{}", analysis);
        println!();
        println!("Session: {}", team.session_id());
        Ok(())
    }
}
