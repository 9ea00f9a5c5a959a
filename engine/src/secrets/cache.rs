use crate::secrets::string::SecretString;
use crate::secrets::SecretManager;
use axon_sdk::errors::TutorError;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Resolves API keys for the service adapters.
///
/// Lookup order: process environment, then the in-memory cache, then the OS
/// keychain. Keychain hits are cached so the keychain is consulted at most
/// once per key.
#[derive(Clone)]
pub struct SecretStore {
    manager: Option<Arc<SecretManager>>,
    read_env: bool,
    cache: Arc<RwLock<HashMap<String, SecretString>>>,
}

impl SecretStore {
    /// Store backed by the environment and the OS keychain
    pub fn new(manager: Arc<SecretManager>) -> Self {
        Self {
            manager: Some(manager),
            read_env: true,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Store that only knows the values inserted into it
    pub fn in_memory() -> Self {
        Self {
            manager: None,
            read_env: false,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Seed or override a value
    pub fn insert(&self, key: &str, value: impl Into<SecretString>) {
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        cache.insert(key.to_string(), value.into());
    }

    /// Look up a key, returning `None` when no source has it
    pub fn get(&self, key: &str) -> Option<SecretString> {
        if self.read_env {
            if let Ok(value) = std::env::var(key) {
                if !value.trim().is_empty() {
                    return Some(SecretString::new(value.trim()));
                }
            }
        }

        {
            let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
            if let Some(secret) = cache.get(key) {
                return Some(secret.clone());
            }
        }

        let raw = self.manager.as_ref()?.get_secret(key)?;
        let secret = SecretString::new(raw);
        self.insert(key, secret.clone());
        Some(secret)
    }

    /// Look up a key that the caller cannot work without
    pub fn require(&self, key: &str) -> Result<SecretString, TutorError> {
        self.get(key).ok_or_else(|| {
            TutorError::Configuration(format!(
                "{} is not set; export it or run `axon secret set {}`",
                key, key
            ))
        })
    }

    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }
}
