//! Provider credential storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use zeroize::Zeroizing;

/// Env-var prefix scanned by [`InMemoryKeyStore::load_from_env`].
///
/// `SWITCHBOARD_API_KEY_OPENAI=sk-...` seeds the key for "openai".
pub const DEFAULT_ENV_PREFIX: &str = "SWITCHBOARD_API_KEY_";

/// Contract the gateway consumes for credential lifecycle.
///
/// All operations are keyed by the normalized (trimmed, lowercased)
/// provider identifier; implementations normalize defensively as well.
#[async_trait]
pub trait KeyStore: Send + Sync {
    /// Fetch the stored key for a provider, if any.
    async fn get_key(&self, provider: &str) -> Option<Zeroizing<String>>;

    /// Store (insert or overwrite) a key. Returns whether storage succeeded.
    async fn store_key(&self, provider: &str, key: &str) -> bool;

    /// Replace an existing key. Returns `false` when no key exists.
    async fn rotate_key(&self, provider: &str, new_key: &str) -> bool;

    /// Delete the stored key. Returns whether a key was removed.
    async fn remove_key(&self, provider: &str) -> bool;
}

/// A stored credential with rotation metadata.
#[derive(Clone)]
struct StoredKey {
    value: SecretString,
    created_at: DateTime<Utc>,
    version: u32,
}

impl StoredKey {
    fn new(value: impl Into<String>) -> Self {
        Self {
            value: SecretString::new(value.into()),
            created_at: Utc::now(),
            version: 1,
        }
    }
}

impl std::fmt::Debug for StoredKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredKey")
            .field("value", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .field("version", &self.version)
            .finish()
    }
}

/// In-memory key store.
///
/// Backed by a reader/writer lock so lookups on the completion path never
/// contend with each other.
#[derive(Debug, Default)]
pub struct InMemoryKeyStore {
    keys: RwLock<HashMap<String, StoredKey>>,
}

impl InMemoryKeyStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed keys from environment variables with the given prefix.
    ///
    /// The remainder of the variable name, lowercased, is the provider
    /// identifier. Returns the number of keys loaded.
    pub async fn load_from_env(&self, prefix: &str) -> usize {
        let mut keys = self.keys.write().await;
        let mut loaded = 0;

        for (name, value) in std::env::vars() {
            if let Some(provider) = name.strip_prefix(prefix) {
                let provider = provider.trim().to_ascii_lowercase();
                if provider.is_empty() || value.is_empty() {
                    continue;
                }
                debug!(provider = %provider, "loaded credential from environment");
                keys.insert(provider, StoredKey::new(value));
                loaded += 1;
            }
        }

        loaded
    }

    /// Current rotation version of a stored key, if present.
    pub async fn key_version(&self, provider: &str) -> Option<u32> {
        let keys = self.keys.read().await;
        keys.get(&normalize(provider)).map(|k| k.version)
    }

    /// Providers with a stored key.
    pub async fn providers(&self) -> Vec<String> {
        let keys = self.keys.read().await;
        keys.keys().cloned().collect()
    }
}

fn normalize(provider: &str) -> String {
    provider.trim().to_ascii_lowercase()
}

#[async_trait]
impl KeyStore for InMemoryKeyStore {
    async fn get_key(&self, provider: &str) -> Option<Zeroizing<String>> {
        let keys = self.keys.read().await;
        keys.get(&normalize(provider))
            .map(|k| Zeroizing::new(k.value.expose_secret().to_string()))
    }

    async fn store_key(&self, provider: &str, key: &str) -> bool {
        let provider = normalize(provider);
        if provider.is_empty() || key.is_empty() {
            return false;
        }
        let mut keys = self.keys.write().await;
        keys.insert(provider, StoredKey::new(key));
        true
    }

    async fn rotate_key(&self, provider: &str, new_key: &str) -> bool {
        let provider = normalize(provider);
        if new_key.is_empty() {
            return false;
        }
        let mut keys = self.keys.write().await;
        match keys.get(&provider) {
            Some(old) => {
                let rotated = StoredKey {
                    value: SecretString::new(new_key.to_string()),
                    created_at: Utc::now(),
                    version: old.version + 1,
                };
                keys.insert(provider, rotated);
                true
            }
            None => false,
        }
    }

    async fn remove_key(&self, provider: &str) -> bool {
        let mut keys = self.keys.write().await;
        keys.remove(&normalize(provider)).is_some()
    }
}
