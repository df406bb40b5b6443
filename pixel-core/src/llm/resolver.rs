//! Model resolution
//!
//! Turns the configured provider and model into a callable handle. An active
//! provider outside the constructor table never blocks a run: the resolver
//! falls back to mistral and says so in the returned [`Resolution`].

use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};

use super::anthropic::AnthropicModel;
use super::gemini::GeminiModel;
use super::openai::OpenAiCompatible;
use super::{ChatModel, ModelSpec};
use crate::config::ConfigStore;
use crate::rotation::KeyRotationManager;
use crate::settings::LlmSettings;
use crate::Result;

/// Provider used when the configured one cannot be built
pub const FALLBACK_PROVIDER: &str = "mistral";

/// Model used with [`FALLBACK_PROVIDER`]
pub const FALLBACK_MODEL: &str = "mistral-large-latest";

type Constructor = fn(ModelSpec) -> Result<Arc<dyn ChatModel>>;

fn openai_compatible(spec: ModelSpec) -> Result<Arc<dyn ChatModel>> {
    Ok(Arc::new(OpenAiCompatible::new(spec)?))
}

fn anthropic(spec: ModelSpec) -> Result<Arc<dyn ChatModel>> {
    Ok(Arc::new(AnthropicModel::new(spec)?))
}

fn gemini(spec: ModelSpec) -> Result<Arc<dyn ChatModel>> {
    Ok(Arc::new(GeminiModel::new(spec)?))
}

const CONSTRUCTORS: &[(&str, Constructor)] = &[
    ("mistral", openai_compatible),
    ("openai", openai_compatible),
    ("anthropic", anthropic),
    ("google", gemini),
    ("groq", openai_compatible),
    ("deepseek", openai_compatible),
];

fn constructor(provider: &str) -> Option<Constructor> {
    CONSTRUCTORS
        .iter()
        .find(|(name, _)| *name == provider)
        .map(|(_, ctor)| *ctor)
}

/// Why resolution did not use the configured provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// The configured provider has no constructor
    UnknownProvider(String),
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::UnknownProvider(name) => write!(f, "unknown provider '{}'", name),
        }
    }
}

/// How a model was chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The configured provider and model
    Exact,
    /// The default pair, used instead of the configured one
    FellBack { reason: FallbackReason },
}

impl Resolution {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Resolution::FellBack { .. })
    }
}

/// A model handle plus how it was obtained
#[derive(Debug, Clone)]
pub struct ResolvedModel {
    pub model: Arc<dyn ChatModel>,
    pub provider: String,
    pub model_id: String,
    pub resolution: Resolution,
    /// Whether a key was available; calls fail without one
    pub has_credential: bool,
}

/// Builds model handles from the user config
#[derive(Debug, Clone)]
pub struct ModelResolver {
    store: ConfigStore,
    llm: LlmSettings,
}

impl ModelResolver {
    pub fn new(store: ConfigStore, llm: LlmSettings) -> Self {
        Self { store, llm }
    }

    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Provider a resolution will actually use
    ///
    /// The configured provider when it can be built, otherwise
    /// [`FALLBACK_PROVIDER`].
    pub fn effective_provider(&self) -> Result<String> {
        let configured = self.store.get_provider()?;
        Ok(match constructor(&configured) {
            Some(_) => configured,
            None => FALLBACK_PROVIDER.to_string(),
        })
    }

    /// Key rotation for the provider resolutions draw from
    pub fn rotation(&self) -> Result<KeyRotationManager> {
        KeyRotationManager::new(&self.store, Some(&self.effective_provider()?))
    }

    /// Resolve with a fresh rotation for the effective provider
    pub fn resolve(&self) -> Result<ResolvedModel> {
        let mut rotation = self.rotation()?;
        self.resolve_with(&mut rotation)
    }

    /// Resolve, drawing one key from `rotation`
    ///
    /// The rotation advances only when it belongs to the provider being
    /// built. Any other provider's key comes from [`KeyRotationManager::key_for`].
    pub fn resolve_with(&self, rotation: &mut KeyRotationManager) -> Result<ResolvedModel> {
        let configured = self.store.get_provider()?;

        let (provider, model_id, ctor, resolution) = match constructor(&configured) {
            Some(ctor) => (
                configured.clone(),
                self.store.get_model(Some(&configured))?,
                ctor,
                Resolution::Exact,
            ),
            None => {
                warn!(
                    provider = %configured,
                    fallback = FALLBACK_PROVIDER,
                    "Unknown provider configured, falling back"
                );
                (
                    FALLBACK_PROVIDER.to_string(),
                    FALLBACK_MODEL.to_string(),
                    openai_compatible as Constructor,
                    Resolution::FellBack {
                        reason: FallbackReason::UnknownProvider(configured.clone()),
                    },
                )
            }
        };

        let api_key = if rotation.provider() == provider {
            rotation.next_key()
        } else {
            rotation.key_for(&provider)?
        };

        if api_key.is_none() {
            warn!(provider = %provider, "No API key configured; model calls will fail");
        }

        let has_credential = api_key.is_some();
        let model = ctor(ModelSpec {
            provider: provider.clone(),
            model_id: model_id.clone(),
            api_key,
            timeout: self.llm.request_timeout,
        })?;

        info!(
            provider = %provider,
            model = %model_id,
            fallback = resolution.is_fallback(),
            "Resolved model"
        );

        Ok(ResolvedModel {
            model,
            provider,
            model_id,
            resolution,
            has_credential,
        })
    }
}
