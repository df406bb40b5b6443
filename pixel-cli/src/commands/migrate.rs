//! Migrate command - run the full Next.js to Nuxt pipeline

use std::path::{Path, PathBuf};

use clap::{ArgAction, Args};
use pixel_core::git::{clone_repo, RepoSource};
use pixel_core::{MigrationReport, MigrationTeam, ProjectInventory, SettingsOverrides};

use super::Context;

/// Arguments for the migrate command
#[derive(Args, Debug, Clone)]
pub struct MigrateArgs {
    /// Next.js project: a local path or an HTTP(S) git URL
    #[arg(long)]
    pub repo: String,

    /// Directory to write the Nuxt project into
    #[arg(long)]
    pub output: PathBuf,

    /// Consult the Nuxt knowledge tool while writing files
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub mcp: bool,

    /// Resume (or start) the session with this id
    #[arg(long)]
    pub session_id: Option<String>,

    /// Fix rounds allowed after a failed type check
    #[arg(long)]
    pub max_fix_attempts: Option<u32>,

    /// Type-check command run in the output directory
    #[arg(long)]
    pub validate_command: Option<String>,
}

impl MigrateArgs {
    /// Execute the migrate command
    pub async fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        let settings = ctx.settings(SettingsOverrides {
            max_fix_attempts: self.max_fix_attempts,
            validate_command: self.validate_command.clone(),
            ..Default::default()
        })?;

        let project = resolve_repo(&self.repo).await?;
        if !project.is_dir() {
            println!("Error: project path does not exist: {}", project.display());
            return Ok(());
        }

        prepare_output_dir(&self.output)?;

        let inventory = ProjectInventory::scan(&project)?;
        if !inventory.is_next_project() {
            tracing::warn!(path = %project.display(), "package.json does not depend on next");
        }

        println!("Pixel-Perfect Migration");
        println!("=======================");
        println!();
        println!("Source: {}", project.display());
        println!("Output: {}", self.output.display());
        println!("Files:  {}", inventory.files.len());
        println!();

        let report = if self.mcp {
            let (team, knowledge) =
                MigrationTeam::build_with_knowledge(&ctx.store, &settings, self.session_id.clone())
                    .await?;
            println!("Session: {} (knowledge tool: {})", team.session_id(), knowledge.url());

            team.migrate_and_close(&knowledge, &inventory, &self.output, &settings.workflow)
                .await?
        } else {
            let team =
                MigrationTeam::build(&ctx.store, &settings, self.session_id.clone()).await?;
            println!("Session: {}", team.session_id());
            team.migrate(&inventory, &self.output, &settings.workflow)
                .await?
        };

        print_report(&report);
        Ok(())
    }
}

/// Local path for `--repo`, cloning remote URLs into the cache first
async fn resolve_repo(repo: &str) -> anyhow::Result<PathBuf> {
    match RepoSource::parse(repo)? {
        RepoSource::Local(path) => Ok(path),
        RepoSource::Remote { url, name } => {
            println!("Cloning {}...", url);
            let path = tokio::task::spawn_blocking(move || clone_repo(&url, &name, None)).await??;
            Ok(path)
        }
    }
}

/// Create the output directory, warning when it already has content
///
/// Returns true when the directory was not empty.
pub fn prepare_output_dir(output: &Path) -> anyhow::Result<bool> {
    let populated = match std::fs::read_dir(output) {
        Ok(mut entries) => entries.next().is_some(),
        Err(_) => false,
    };

    if populated {
        println!(
            "Warning: output directory {} is not empty; existing files may be overwritten",
            output.display()
        );
        tracing::warn!(path = %output.display(), "Output directory is not empty");
    }

    std::fs::create_dir_all(output)?;
    Ok(populated)
}

fn print_report(report: &MigrationReport) {
    println!();
    println!("Plan: {}", report.plan.summary);
    for rejected in &report.rejected {
        println!(
            "  skipped {} -> {}: {}",
            rejected.entry.source_path, rejected.entry.target_path, rejected.reason
        );
    }
    if !report.plan.config_changes.is_empty() {
        println!("Config changes:");
        for change in &report.plan.config_changes {
            println!("  - {}", change);
        }
    }

    println!();
    println!("Wrote {} file(s):", report.written.len());
    for path in &report.written {
        println!("  {}", path);
    }

    println!();
    if report.succeeded() {
        println!("Migration complete (session {})", report.session_id);
    } else {
        println!(
            "Type check still failing after {} fix attempt(s) (session {})",
            report.fix_attempts, report.session_id
        );
        if let Some(errors) = &report.last_errors {
            println!();
            println!("{}", errors.trim_end());
        }
        println!();
        println!(
            "Resume with: pixel-perfect session-resume {} --repo <repo> --output <dir>",
            report.session_id
        );
    }
}
