//! Config commands - provider, API keys and model overrides

use clap::Args;
use pixel_core::providers;

use super::Context;

/// Set the active provider
#[derive(Args, Debug)]
pub struct ConfigProviderArgs {
    /// Provider name (mistral, openai, anthropic, google, groq, deepseek)
    pub name: String,
}

/// Save one or more API keys
#[derive(Args, Debug)]
pub struct ConfigKeyArgs {
    /// A key, or several separated by commas
    pub keys: String,

    /// Provider the keys belong to (defaults to the active provider)
    #[arg(short, long)]
    pub provider: Option<String>,
}

/// Remove saved API keys
#[derive(Args, Debug)]
pub struct ConfigClearArgs {
    /// Provider to clear (defaults to the active provider)
    #[arg(short, long)]
    pub provider: Option<String>,
}

/// Override the model for a provider
#[derive(Args, Debug)]
pub struct ConfigModelArgs {
    /// Model identifier
    pub model: String,

    /// Provider to configure (defaults to the active provider)
    #[arg(short, long)]
    pub provider: Option<String>,
}

fn target_provider(ctx: &Context, provider: Option<&str>) -> anyhow::Result<String> {
    match provider {
        Some(p) => Ok(p.to_string()),
        None => Ok(ctx.store.get_provider()?),
    }
}

pub fn show(ctx: &Context) -> anyhow::Result<()> {
    println!("{}", ctx.store.show_config()?);
    Ok(())
}

impl ConfigProviderArgs {
    pub fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        if ctx.store.set_provider(&self.name)? {
            println!("Provider set to {}", self.name);
        } else {
            println!(
                "Unknown provider '{}'. Supported providers: {}",
                self.name,
                providers::names().join(", ")
            );
        }
        Ok(())
    }
}

impl ConfigKeyArgs {
    pub fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        let provider = target_provider(ctx, self.provider.as_deref())?;
        if ctx.store.add_api_key(&self.keys, Some(&provider))? {
            let count = ctx.store.get_api_keys(Some(&provider))?.len();
            println!("Saved API key(s) for {} ({} total)", provider, count);
        } else {
            println!(
                "Unknown provider '{}'. Supported providers: {}",
                provider,
                providers::names().join(", ")
            );
        }
        Ok(())
    }
}

impl ConfigClearArgs {
    pub fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        let provider = target_provider(ctx, self.provider.as_deref())?;
        ctx.store.clear_api_keys(Some(&provider))?;
        println!("Cleared saved API keys for {}", provider);
        Ok(())
    }
}

impl ConfigModelArgs {
    pub fn execute(&self, ctx: &Context) -> anyhow::Result<()> {
        let provider = target_provider(ctx, self.provider.as_deref())?;
        ctx.store.set_model(&self.model, Some(&provider))?;
        println!("Model for {} set to {}", provider, self.model);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixel_core::{ConfigStore, EnvSource};
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn context(dir: &TempDir) -> Context {
        Context {
            store: ConfigStore::at(dir.path().join("config.json"))
                .with_env(EnvSource::Fixed(HashMap::new())),
            verbose: false,
        }
    }

    #[test]
    fn test_config_key_then_show() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);

        ConfigKeyArgs {
            keys: "sk-openai-0000000001,sk-openai-0000000002".to_string(),
            provider: Some("openai".to_string()),
        }
        .execute(&ctx)
        .unwrap();

        let view = ctx.store.show_config().unwrap();
        let keys = &view.api_keys["openai"];
        assert_eq!(keys.len(), 2);
        assert!(keys.iter().all(|k| k.contains("...")));
        assert!(!view.to_string().contains("sk-openai-0000000001"));
    }

    #[test]
    fn test_unknown_provider_is_not_saved() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);

        ConfigProviderArgs {
            name: "nope".to_string(),
        }
        .execute(&ctx)
        .unwrap();
        assert_eq!(ctx.store.get_provider().unwrap(), "mistral");
    }

    #[test]
    fn test_model_defaults_to_active_provider() {
        let dir = TempDir::new().unwrap();
        let ctx = context(&dir);

        ConfigModelArgs {
            model: "mistral-small-latest".to_string(),
            provider: None,
        }
        .execute(&ctx)
        .unwrap();
        assert_eq!(
            ctx.store.get_model(Some("mistral")).unwrap(),
            "mistral-small-latest"
        );
    }
}
