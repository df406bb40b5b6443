//! Session commands - list and resume migration sessions

use std::path::PathBuf;

use clap::{ArgAction, Args};
use pixel_core::SettingsOverrides;
use pixel_db::Database;

use super::{Context, MigrateArgs};

/// List recent sessions
#[derive(Args, Debug)]
pub struct SessionListArgs {
    /// Number of sessions to show
    #[arg(
        short = 'n',
        long,
        default_value_t = 10,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub limit: u32,
}

/// Continue a migration under an existing session id
#[derive(Args, Debug)]
pub struct SessionResumeArgs {
    /// Session to resume; an unknown id starts a new session with that id
    pub session_id: String,

    /// Next.js project: a local path or an HTTP(S) git URL
    #[arg(long)]
    pub repo: String,

    /// Directory to write the Nuxt project into
    #[arg(long)]
    pub output: PathBuf,

    /// Consult the Nuxt knowledge tool while writing files
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pub mcp: bool,
}

impl SessionListArgs {
    pub async fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        let settings = ctx.settings(SettingsOverrides::default())?;
        let Some(path) = settings.session.resolved_db_path() else {
            println!("Error: could not determine session database path");
            return Ok(());
        };

        if !path.exists() {
            println!("No sessions found.");
            return Ok(());
        }

        let db = Database::new(&path).await?;
        let sessions = db.sessions().list_recent(i64::from(self.limit)).await?;
        if sessions.is_empty() {
            println!("No sessions found.");
        } else {
            println!("Recent sessions:");
            for session in &sessions {
                let turns = db.turns().count(&session.session_id).await?;
                println!(
                    "  {}  updated {}  ({} turns)",
                    session.session_id,
                    session.updated_at.format("%Y-%m-%d %H:%M:%S UTC"),
                    turns
                );
            }
        }
        db.close().await;
        Ok(())
    }
}

impl SessionResumeArgs {
    pub async fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        MigrateArgs {
            repo: self.repo.clone(),
            output: self.output.clone(),
            mcp: self.mcp,
            session_id: Some(self.session_id.clone()),
            max_fix_attempts: None,
            validate_command: None,
        }
        .execute(ctx)
        .await
    }
}
