//! Static catalog of supported model providers
//!
//! The first entry is the primary provider used when nothing is configured.

/// One supported provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Provider name as used on the command line and in the config file
    pub name: &'static str,
    /// Environment variable holding a comma-separated list of keys
    pub env_var: &'static str,
    /// Model used when the user has not set an override
    pub default_model: &'static str,
}

/// All supported providers, primary first
pub const PROVIDERS: &[ProviderConfig] = &[
    ProviderConfig {
        name: "mistral",
        env_var: "MISTRAL_API_KEYS",
        default_model: "mistral-large-latest",
    },
    ProviderConfig {
        name: "openai",
        env_var: "OPENAI_API_KEY",
        default_model: "gpt-4o",
    },
    ProviderConfig {
        name: "anthropic",
        env_var: "ANTHROPIC_API_KEY",
        default_model: "claude-sonnet-4-5",
    },
    ProviderConfig {
        name: "google",
        env_var: "GOOGLE_API_KEY",
        default_model: "gemini-2.0-flash",
    },
    ProviderConfig {
        name: "groq",
        env_var: "GROQ_API_KEY",
        default_model: "llama-3.3-70b-versatile",
    },
    ProviderConfig {
        name: "deepseek",
        env_var: "DEEPSEEK_API_KEY",
        default_model: "deepseek-chat",
    },
];

/// Look up a provider by name
pub fn find(name: &str) -> Option<&'static ProviderConfig> {
    PROVIDERS.iter().find(|p| p.name == name)
}

/// The primary provider
pub fn primary() -> &'static ProviderConfig {
    &PROVIDERS[0]
}

/// Whether `name` is in the catalog
pub fn is_supported(name: &str) -> bool {
    find(name).is_some()
}

/// Names of all providers, primary first
pub fn names() -> Vec<&'static str> {
    PROVIDERS.iter().map(|p| p.name).collect()
}
