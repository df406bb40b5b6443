//! CLI command implementations

pub mod analyze;
pub mod config;
pub mod migrate;
pub mod session;

use std::path::PathBuf;

use pixel_core::{ConfigStore, Settings, SettingsOverrides};

pub use analyze::AnalyzeArgs;
pub use config::{ConfigClearArgs, ConfigKeyArgs, ConfigModelArgs, ConfigProviderArgs};
pub use migrate::MigrateArgs;
pub use session::{SessionListArgs, SessionResumeArgs};

/// Config store and settings shared by every command
#[derive(Debug, Clone)]
pub struct Context {
    pub store: ConfigStore,
    pub verbose: bool,
}

impl Context {
    /// Open the user config, honouring an explicit file
    pub fn new(config_file: Option<PathBuf>, verbose: bool) -> anyhow::Result<Self> {
        let store = match config_file {
            Some(path) => ConfigStore::at(path),
            None => ConfigStore::open_default()?,
        };
        Ok(Self { store, verbose })
    }

    /// Runtime settings with command-line overrides applied
    pub fn settings(&self, overrides: SettingsOverrides) -> anyhow::Result<Settings> {
        let settings = Settings::load_with_overrides(overrides)?;
        if self.verbose {
            tracing::info!(?settings, "Settings loaded");
        }
        Ok(settings)
    }
}
