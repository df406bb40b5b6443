//! User configuration store for Pixel-Perfect
//!
//! Persists the active provider, API keys per provider and model overrides to
//! `~/.config/pixel-perfect/config.json`. The file holds credentials, so it is
//! written with owner-only permissions on Unix.
//!
//! Key lookup priority:
//! 1. Keys saved with `config-key`
//! 2. The provider's environment variable (comma-separated list)

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::providers;
use crate::{Error, Result};

/// Environment variable that relocates the config file
pub const CONFIG_FILE_ENV: &str = "PIXEL_CONFIG_FILE";

/// Persisted user settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct UserConfig {
    /// Active provider name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Ordered credentials per provider; order is the rotation order
    pub api_keys: BTreeMap<String, Vec<String>>,

    /// Model overrides per provider
    pub models: BTreeMap<String, String>,
}

/// Where environment variables are read from
#[derive(Debug, Clone, Default)]
pub enum EnvSource {
    /// The process environment
    #[default]
    Process,
    /// A fixed set of variables
    Fixed(HashMap<String, String>),
}

impl EnvSource {
    /// Read a variable
    pub fn var(&self, name: &str) -> Option<String> {
        match self {
            EnvSource::Process => std::env::var(name).ok(),
            EnvSource::Fixed(vars) => vars.get(name).cloned(),
        }
    }
}

/// Split a comma-separated key list, trimming and dropping empty pieces
pub fn split_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

/// Mask a credential for display
///
/// Keys longer than 12 characters show their first 8 and last 4 characters;
/// anything shorter is fully hidden.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() > 12 {
        let head: String = chars[..8].iter().collect();
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", head, tail)
    } else {
        "***".to_string()
    }
}

/// Display record produced by [`ConfigStore::show_config`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigView {
    /// Active provider
    pub provider: String,
    /// Model that provider will use
    pub model: String,
    /// Masked persisted keys per provider
    pub api_keys: BTreeMap<String, Vec<String>>,
    /// Location of the config file
    pub config_file: PathBuf,
}

impl fmt::Display for ConfigView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Provider: {}", self.provider)?;
        writeln!(f, "Model: {}", self.model)?;
        writeln!(f, "API keys:")?;
        if self.api_keys.values().all(Vec::is_empty) {
            writeln!(f, "  (none saved - environment variables are used)")?;
        }
        for (provider, keys) in &self.api_keys {
            if keys.is_empty() {
                continue;
            }
            writeln!(f, "  {}:", provider)?;
            for key in keys {
                writeln!(f, "    - {}", key)?;
            }
        }
        write!(f, "Config file: {}", self.config_file.display())
    }
}

/// Reads and writes the user config file
///
/// Every mutation rewrites the whole file immediately; nothing is cached
/// between calls.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
    env: EnvSource,
}

impl ConfigStore {
    /// Store backed by a specific file
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            env: EnvSource::Process,
        }
    }

    /// Store at the default location, honouring `PIXEL_CONFIG_FILE`
    pub fn open_default() -> Result<Self> {
        if let Ok(path) = std::env::var(CONFIG_FILE_ENV) {
            if !path.trim().is_empty() {
                return Ok(Self::at(path.trim()));
            }
        }
        let path = Self::default_config_path()
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;
        Ok(Self::at(path))
    }

    /// Replace the environment used for key fallback
    pub fn with_env(mut self, env: EnvSource) -> Self {
        self.env = env;
        self
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/pixel-perfect/config.json` on Linux
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("pixel-perfect").join("config.json"))
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Environment used for key fallback
    pub fn env(&self) -> &EnvSource {
        &self.env
    }

    /// Load the file, or an empty config if it does not exist
    pub fn load(&self) -> Result<UserConfig> {
        if !self.path.exists() {
            return Ok(UserConfig::default());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        if contents.trim().is_empty() {
            return Ok(UserConfig::default());
        }
        serde_json::from_str(&contents).map_err(|e| {
            Error::Config(format!(
                "Failed to parse config file {}: {}",
                self.path.display(),
                e
            ))
        })
    }

    fn save(&self, config: &UserConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(config)?;
        std::fs::write(&self.path, json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            if let Err(e) = std::fs::set_permissions(&self.path, perms) {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Could not restrict config file permissions"
                );
            }
        }

        debug!(path = %self.path.display(), "Saved user config");
        Ok(())
    }

    fn resolve_provider(&self, config: &UserConfig, provider: Option<&str>) -> String {
        provider
            .map(str::to_string)
            .or_else(|| config.provider.clone())
            .unwrap_or_else(|| providers::primary().name.to_string())
    }

    /// Active provider, defaulting to the primary catalog entry
    pub fn get_provider(&self) -> Result<String> {
        let config = self.load()?;
        Ok(self.resolve_provider(&config, None))
    }

    /// Switch the active provider
    ///
    /// Returns false, without touching the file, for a provider outside the catalog.
    pub fn set_provider(&self, name: &str) -> Result<bool> {
        if !providers::is_supported(name) {
            debug!(provider = name, "Rejected unknown provider");
            return Ok(false);
        }
        let mut config = self.load()?;
        config.provider = Some(name.to_string());
        self.save(&config)?;
        Ok(true)
    }

    /// Keys for a provider (default: active), falling back to its environment variable
    pub fn get_api_keys(&self, provider: Option<&str>) -> Result<Vec<String>> {
        let config = self.load()?;
        let provider = self.resolve_provider(&config, provider);

        let saved = config.api_keys.get(&provider).cloned().unwrap_or_default();
        if !saved.is_empty() {
            return Ok(saved);
        }

        let from_env = providers::find(&provider)
            .and_then(|p| self.env.var(p.env_var))
            .map(|raw| split_keys(&raw))
            .unwrap_or_default();

        if !from_env.is_empty() {
            debug!(provider = %provider, count = from_env.len(), "Using API keys from environment");
        }
        Ok(from_env)
    }

    /// Append one key or a comma-separated list of keys
    ///
    /// Keys already present are skipped. Returns false for an unknown provider.
    pub fn add_api_key(&self, keys: &str, provider: Option<&str>) -> Result<bool> {
        let mut config = self.load()?;
        let provider = self.resolve_provider(&config, provider);
        if !providers::is_supported(&provider) {
            return Ok(false);
        }

        let existing = config.api_keys.entry(provider.clone()).or_default();
        let mut added = 0usize;
        for key in split_keys(keys) {
            if !existing.contains(&key) {
                existing.push(key);
                added += 1;
            }
        }

        if added > 0 {
            self.save(&config)?;
        }
        debug!(provider = %provider, added, "Added API keys");
        Ok(true)
    }

    /// Remove all saved keys for a provider
    pub fn clear_api_keys(&self, provider: Option<&str>) -> Result<()> {
        let mut config = self.load()?;
        let provider = self.resolve_provider(&config, provider);
        config.api_keys.insert(provider, Vec::new());
        self.save(&config)
    }

    /// Model for a provider: override, catalog default, or empty for unknown providers
    pub fn get_model(&self, provider: Option<&str>) -> Result<String> {
        let config = self.load()?;
        let provider = self.resolve_provider(&config, provider);

        if let Some(model) = config.models.get(&provider) {
            if !model.is_empty() {
                return Ok(model.clone());
            }
        }

        Ok(providers::find(&provider)
            .map(|p| p.default_model.to_string())
            .unwrap_or_default())
    }

    /// Persist a model override; the id is checked by the provider on first use
    pub fn set_model(&self, model: &str, provider: Option<&str>) -> Result<()> {
        let mut config = self.load()?;
        let provider = self.resolve_provider(&config, provider);
        config.models.insert(provider, model.to_string());
        self.save(&config)
    }

    /// Current configuration with every saved key masked
    pub fn show_config(&self) -> Result<ConfigView> {
        let config = self.load()?;
        let provider = self.resolve_provider(&config, None);
        let model = self.get_model(Some(&provider))?;

        let api_keys = config
            .api_keys
            .iter()
            .map(|(p, keys)| (p.clone(), keys.iter().map(|k| mask_key(k)).collect()))
            .collect();

        Ok(ConfigView {
            provider,
            model,
            api_keys,
            config_file: self.path.clone(),
        })
    }
}
