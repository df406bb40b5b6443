//! Runtime settings for Pixel-Perfect
//!
//! Settings are loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (PIXEL_*)
//! 3. Settings file (~/.config/pixel-perfect/settings.toml)
//! 4. Default values
//!
//! Provider, keys and model live in the JSON user config instead
//! (see [`crate::config`]).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::EnvSource;
use crate::{Error, Result};

/// Session history settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Location of the session database
    pub db_path: Option<PathBuf>,

    /// Number of prior turns replayed into each prompt
    pub history_window: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            db_path: None,
            history_window: 10,
        }
    }
}

impl SessionSettings {
    /// Configured database path, or `~/.cache/pixel-perfect/sessions.db`
    pub fn resolved_db_path(&self) -> Option<PathBuf> {
        self.db_path.clone().or_else(|| {
            dirs::cache_dir().map(|p| p.join("pixel-perfect").join("sessions.db"))
        })
    }
}

/// Migration workflow settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkflowSettings {
    /// Fix rounds allowed after the first failed validation
    pub max_fix_attempts: u32,

    /// Type-check command run in the output directory; empty skips validation
    pub validate_command: String,

    /// Command run in the output directory before files are written
    pub scaffold_command: Option<String>,

    /// Upper bound for any single shell command
    #[serde(with = "humantime_serde")]
    pub command_timeout: Duration,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            max_fix_attempts: 3,
            validate_command: "npx nuxi typecheck".to_string(),
            scaffold_command: None,
            command_timeout: Duration::from_secs(300),
        }
    }
}

/// Remote knowledge tool settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct KnowledgeSettings {
    /// MCP endpoint
    pub url: String,

    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for KnowledgeSettings {
    fn default() -> Self {
        Self {
            url: "https://nuxt.com/mcp".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Model request settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Per-request timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Completion token limit
    pub max_tokens: u32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(120),
            max_tokens: 8192,
        }
    }
}

/// Prompt overrides
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PromptSettings {
    /// File replacing the built-in system prompt
    pub system_file: Option<PathBuf>,
}

/// Root settings structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub session: SessionSettings,
    pub workflow: WorkflowSettings,
    pub knowledge: KnowledgeSettings,
    pub llm: LlmSettings,
    pub prompts: PromptSettings,
}

/// Settings supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub db_path: Option<PathBuf>,
    pub max_fix_attempts: Option<u32>,
    pub validate_command: Option<String>,
    pub knowledge_url: Option<String>,
}

impl Settings {
    /// Load settings from the default location
    ///
    /// Returns default settings if the file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_settings_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load settings from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse settings: {}", e)))
    }

    /// Get the default settings file path
    ///
    /// Returns `~/.config/pixel-perfect/settings.toml` on Linux
    pub fn default_settings_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("pixel-perfect").join("settings.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - PIXEL_DB_PATH: session database file
    /// - PIXEL_MAX_FIX_ATTEMPTS: fix rounds before giving up
    /// - PIXEL_VALIDATE_COMMAND: type-check command
    /// - PIXEL_SCAFFOLD_COMMAND: scaffold command
    /// - PIXEL_KNOWLEDGE_URL: MCP endpoint
    /// - PIXEL_SYSTEM_PROMPT_FILE: system prompt replacement
    pub fn with_env_overrides(mut self, env: &EnvSource) -> Self {
        if let Some(path) = env.var("PIXEL_DB_PATH") {
            self.session.db_path = Some(PathBuf::from(path));
        }

        if let Some(raw) = env.var("PIXEL_MAX_FIX_ATTEMPTS") {
            match raw.trim().parse() {
                Ok(n) => self.workflow.max_fix_attempts = n,
                Err(_) => tracing::warn!(value = %raw, "Ignoring invalid PIXEL_MAX_FIX_ATTEMPTS"),
            }
        }

        if let Some(cmd) = env.var("PIXEL_VALIDATE_COMMAND") {
            self.workflow.validate_command = cmd;
        }

        if let Some(cmd) = env.var("PIXEL_SCAFFOLD_COMMAND") {
            self.workflow.scaffold_command = Some(cmd).filter(|c| !c.trim().is_empty());
        }

        if let Some(url) = env.var("PIXEL_KNOWLEDGE_URL") {
            self.knowledge.url = url;
        }

        if let Some(path) = env.var("PIXEL_SYSTEM_PROMPT_FILE") {
            self.prompts.system_file = Some(PathBuf::from(path));
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(mut self, overrides: SettingsOverrides) -> Self {
        if let Some(path) = overrides.db_path {
            self.session.db_path = Some(path);
        }

        if let Some(n) = overrides.max_fix_attempts {
            self.workflow.max_fix_attempts = n;
        }

        if let Some(cmd) = overrides.validate_command {
            self.workflow.validate_command = cmd;
        }

        if let Some(url) = overrides.knowledge_url {
            self.knowledge.url = url;
        }

        self
    }

    /// Load settings with all overrides applied
    ///
    /// Priority: CLI > env > settings file > defaults
    pub fn load_with_overrides(overrides: SettingsOverrides) -> Result<Self> {
        Ok(Self::load()?
            .with_env_overrides(&EnvSource::Process)
            .with_cli_overrides(overrides))
    }

    /// System prompt replacement, if one is configured
    pub fn system_prompt_override(&self) -> Result<Option<String>> {
        match &self.prompts.system_file {
            Some(path) => std::fs::read_to_string(path).map(Some).map_err(|e| {
                Error::Config(format!(
                    "Failed to read system prompt {}: {}",
                    path.display(),
                    e
                ))
            }),
            None => Ok(None),
        }
    }
}
