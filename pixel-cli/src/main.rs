//! Pixel-Perfect CLI
//!
//! Migrates a Next.js project to Nuxt with a team of LLM agents.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use pixel_core::SettingsOverrides;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{
    AnalyzeArgs, ConfigClearArgs, ConfigKeyArgs, ConfigModelArgs, ConfigProviderArgs, Context,
    MigrateArgs, SessionListArgs, SessionResumeArgs,
};

/// Pixel-Perfect: Next.js to Nuxt.js migration agents
#[derive(Parser, Debug)]
#[command(name = "pixel-perfect")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// User config file (provider, API keys, models)
    #[arg(long, global = true, env = "PIXEL_CONFIG_FILE")]
    config_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Migrate a Next.js project to Nuxt
    Migrate(MigrateArgs),

    /// Analyze a Next.js project without migrating it
    Analyze(AnalyzeArgs),

    /// Show the current configuration with masked keys
    ConfigShow,

    /// Set the active provider
    ConfigProvider(ConfigProviderArgs),

    /// Save API keys (comma-separated for rotation)
    ConfigKey(ConfigKeyArgs),

    /// Remove saved API keys
    ConfigClear(ConfigClearArgs),

    /// Override the model for a provider
    ConfigModel(ConfigModelArgs),

    /// List recent migration sessions
    SessionList(SessionListArgs),

    /// Resume a migration session
    SessionResume(SessionResumeArgs),

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    // failures are reported, not turned into an exit status
    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
    }

    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = Context::new(cli.config_file, cli.verbose)?;

    match cli.command {
        Some(Commands::Migrate(args)) => args.execute(&ctx).await?,
        Some(Commands::Analyze(args)) => args.execute(&ctx).await?,
        Some(Commands::ConfigShow) => commands::config::show(&ctx)?,
        Some(Commands::ConfigProvider(args)) => args.execute(&ctx)?,
        Some(Commands::ConfigKey(args)) => args.execute(&ctx)?,
        Some(Commands::ConfigClear(args)) => args.execute(&ctx)?,
        Some(Commands::ConfigModel(args)) => args.execute(&ctx)?,
        Some(Commands::SessionList(args)) => args.execute(&ctx).await?,
        Some(Commands::SessionResume(args)) => args.execute(&ctx).await?,
        Some(Commands::Version) => {
            let settings = ctx.settings(SettingsOverrides::default())?;
            let provider = ctx.store.get_provider()?;
            println!("pixel-perfect {}", env!("CARGO_PKG_VERSION"));
            println!("Provider: {}", provider);
            println!("Model: {}", ctx.store.get_model(Some(&provider))?);
            println!(
                "Knowledge tool: enabled by default ({}); disable with --mcp=false",
                settings.knowledge.url
            );
        }
        None => {
            println!("Pixel-Perfect - Next.js to Nuxt.js migration agents");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}
