//! Round-robin API key rotation
//!
//! A [`KeyRotationManager`] is a plain value: build one where credentials are
//! needed and pass it to whatever consumes them. Two managers never share a
//! cursor.

use std::fmt;

use tracing::debug;

use crate::config::{mask_key, ConfigStore};
use crate::Result;

/// Hands out a provider's keys in order, wrapping around
pub struct KeyRotationManager {
    store: Option<ConfigStore>,
    provider: String,
    keys: Vec<String>,
    cursor: usize,
}

impl KeyRotationManager {
    /// Snapshot the keys for `provider` (default: the active provider)
    ///
    /// Persisted keys are used when present, otherwise the provider's
    /// environment variable.
    pub fn new(store: &ConfigStore, provider: Option<&str>) -> Result<Self> {
        let provider = match provider {
            Some(p) => p.to_string(),
            None => store.get_provider()?,
        };
        let keys = store.get_api_keys(Some(&provider))?;
        debug!(provider = %provider, keys = keys.len(), "Created key rotation");

        Ok(Self {
            store: Some(store.clone()),
            provider,
            keys,
            cursor: 0,
        })
    }

    /// Rotation over a fixed key list
    pub fn from_keys(provider: impl Into<String>, keys: Vec<String>) -> Self {
        Self {
            store: None,
            provider: provider.into(),
            keys,
            cursor: 0,
        }
    }

    /// Provider whose keys this manager rotates
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Number of keys in the rotation
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether there is nothing to rotate
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Next key in round-robin order, or `None` when no keys are configured
    pub fn next_key(&mut self) -> Option<String> {
        if self.keys.is_empty() {
            return None;
        }
        let key = self.keys[self.cursor].clone();
        debug!(provider = %self.provider, slot = self.cursor, "Issued API key");
        self.cursor = (self.cursor + 1) % self.keys.len();
        Some(key)
    }

    /// Next key of another provider
    ///
    /// Uses a throwaway manager over the same store, so this manager's cursor
    /// does not move. A manager built with [`from_keys`](Self::from_keys) has
    /// no store and returns `None` for every other provider.
    pub fn key_for(&self, provider: &str) -> Result<Option<String>> {
        match &self.store {
            Some(store) => Ok(Self::new(store, Some(provider))?.next_key()),
            None => Ok(None),
        }
    }
}

impl fmt::Debug for KeyRotationManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let masked: Vec<String> = self.keys.iter().map(|k| mask_key(k)).collect();
        f.debug_struct("KeyRotationManager")
            .field("provider", &self.provider)
            .field("keys", &masked)
            .field("cursor", &self.cursor)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EnvSource;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn keys(list: &[&str]) -> Vec<String> {
        list.iter().map(|k| k.to_string()).collect()
    }

    #[test]
    fn test_round_robin_cycle() {
        let mut rotation = KeyRotationManager::from_keys("mistral", keys(&["a", "b", "c"]));

        assert_eq!(rotation.next_key().as_deref(), Some("a"));
        assert_eq!(rotation.next_key().as_deref(), Some("b"));
        assert_eq!(rotation.next_key().as_deref(), Some("c"));
        assert_eq!(rotation.next_key().as_deref(), Some("a"));
    }

    #[test]
    fn test_each_key_once_per_cycle() {
        for n in 1..6 {
            let list: Vec<String> = (0..n).map(|i| format!("key-{}", i)).collect();
            let mut rotation = KeyRotationManager::from_keys("openai", list.clone());

            let issued: Vec<String> = (0..n).filter_map(|_| rotation.next_key()).collect();
            assert_eq!(issued, list);
            assert_eq!(rotation.next_key(), Some(list[0].clone()));
        }
    }

    #[test]
    fn test_empty_rotation() {
        let mut rotation = KeyRotationManager::from_keys("groq", Vec::new());
        assert!(rotation.is_empty());
        assert_eq!(rotation.next_key(), None);
        assert_eq!(rotation.next_key(), None);
    }

    #[test]
    fn test_loads_from_store_with_env_fallback() {
        let dir = TempDir::new().unwrap();
        let mut vars = HashMap::new();
        vars.insert("MISTRAL_API_KEYS".to_string(), "e1,e2".to_string());
        let store = ConfigStore::at(dir.path().join("config.json"))
            .with_env(EnvSource::Fixed(vars));

        let mut rotation = KeyRotationManager::new(&store, None).unwrap();
        assert_eq!(rotation.provider(), "mistral");
        assert_eq!(rotation.next_key().as_deref(), Some("e1"));
        assert_eq!(rotation.next_key().as_deref(), Some("e2"));
    }

    #[test]
    fn test_snapshot_ignores_later_writes() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::at(dir.path().join("config.json"))
            .with_env(EnvSource::Fixed(HashMap::new()));
        store.add_api_key("first", Some("openai")).unwrap();

        let mut rotation = KeyRotationManager::new(&store, Some("openai")).unwrap();
        store.add_api_key("second", Some("openai")).unwrap();

        assert_eq!(rotation.len(), 1);
        assert_eq!(rotation.next_key().as_deref(), Some("first"));
        assert_eq!(rotation.next_key().as_deref(), Some("first"));
    }

    #[test]
    fn test_key_for_leaves_cursor_alone() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::at(dir.path().join("config.json"))
            .with_env(EnvSource::Fixed(HashMap::new()));
        store.add_api_key("m1,m2", Some("mistral")).unwrap();
        store.add_api_key("o1,o2", Some("openai")).unwrap();

        let mut rotation = KeyRotationManager::new(&store, Some("mistral")).unwrap();
        assert_eq!(rotation.next_key().as_deref(), Some("m1"));

        // every lookup gets a fresh cursor
        assert_eq!(rotation.key_for("openai").unwrap().as_deref(), Some("o1"));
        assert_eq!(rotation.key_for("openai").unwrap().as_deref(), Some("o1"));

        assert_eq!(rotation.next_key().as_deref(), Some("m2"));
    }

    #[test]
    fn test_key_for_missing_provider_keys() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::at(dir.path().join("config.json"))
            .with_env(EnvSource::Fixed(HashMap::new()));
        let rotation = KeyRotationManager::new(&store, Some("mistral")).unwrap();
        assert_eq!(rotation.key_for("deepseek").unwrap(), None);
    }

    #[test]
    fn test_debug_masks_keys() {
        let rotation =
            KeyRotationManager::from_keys("openai", keys(&["sk-verysecretvalue1234"]));
        let rendered = format!("{:?}", rotation);
        assert!(!rendered.contains("verysecretvalue"));
        assert!(rendered.contains("sk-verys...1234"));
    }
}
