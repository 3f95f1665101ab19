//! Content-addressed storage for finished narration payloads.
//!
//! [`ResponseCache`] is the key-value store the router talks to: get, set,
//! delete and a prefix scan. [`VoiceCache`] layers the voice key namespace and
//! the entry lifetime policy on top of a backend.

pub mod file;
pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::settings::config::{CacheBackend, CacheSettings};
use crate::settings::SettingsManager;

pub use file::FileCache;
pub use memory::MemoryCache;

/// Every key written by the voice router starts with this prefix.
pub const VOICE_KEY_PREFIX: &str = "voice_";

/// Derive the cache key for a narration request. The key depends only on the
/// request content, so identical requests always share an entry. Each field is
/// hashed with its byte length in front, so field boundaries cannot shift.
pub fn cache_key(text: &str, character: &str, emotion: &str) -> String {
    let mut hasher = Sha256::new();
    for field in [text, character, emotion] {
        hasher.update((field.len() as u64).to_le_bytes());
        hasher.update(field.as_bytes());
    }
    format!("{}{:x}", VOICE_KEY_PREFIX, hasher.finalize())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub value: String,
    pub stored_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            stored_at: Utc::now(),
        }
    }

    pub fn is_expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        // A negative age (clock skew) is treated as fresh.
        (now - self.stored_at)
            .to_std()
            .map(|age| age > ttl)
            .unwrap_or(false)
    }
}

#[async_trait]
pub trait ResponseCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>>;

    /// Store an entry, replacing any previous value under the same key.
    async fn set(&self, entry: CacheEntry) -> Result<()>;

    /// Returns whether an entry was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    /// Delete every key starting with `prefix`, returning the removed keys.
    /// A key that fails to delete is logged and left out of the result; only
    /// a failed scan is an error.
    async fn delete_by_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut deleted = Vec::new();
        for key in self.keys_with_prefix(prefix).await? {
            match self.delete(&key).await {
                Ok(true) => deleted.push(key),
                Ok(false) => {}
                Err(e) => warn!(cache_key = %key, error = %e, "Failed to delete cache entry"),
            }
        }
        deleted.sort();
        Ok(deleted)
    }
}

/// The voice namespace of a [`ResponseCache`] with an optional entry lifetime.
/// Expired entries read as a miss and are removed on the spot.
#[derive(Clone)]
pub struct VoiceCache {
    backend: Arc<dyn ResponseCache>,
    ttl: Option<Duration>,
}

impl VoiceCache {
    pub fn new(backend: Arc<dyn ResponseCache>, ttl: Option<Duration>) -> Self {
        Self { backend, ttl }
    }

    pub fn from_settings(settings: &CacheSettings) -> Result<Self> {
        let backend: Arc<dyn ResponseCache> = match settings.backend {
            CacheBackend::Memory => Arc::new(MemoryCache::new()),
            CacheBackend::File => {
                let dir = match &settings.dir {
                    Some(dir) => dir.clone(),
                    None => SettingsManager::default_cache_dir()?,
                };
                Arc::new(FileCache::new(dir)?)
            }
        };
        Ok(Self::new(backend, settings.ttl()))
    }

    pub fn ttl(&self) -> Option<Duration> {
        self.ttl
    }

    pub async fn lookup(&self, key: &str) -> Result<Option<String>> {
        let Some(entry) = self.backend.get(key).await? else {
            return Ok(None);
        };

        if let Some(ttl) = self.ttl {
            if entry.is_expired(ttl, Utc::now()) {
                debug!(cache_key = %key, stored_at = %entry.stored_at, "Evicting expired cache entry");
                self.backend.delete(key).await?;
                return Ok(None);
            }
        }

        Ok(Some(entry.value))
    }

    pub async fn store(&self, key: &str, value: &str) -> Result<()> {
        self.backend.set(CacheEntry::new(key, value)).await
    }

    /// Remove every voice entry. Keys outside the voice namespace are untouched.
    pub async fn clear(&self) -> Result<Vec<String>> {
        self.backend.delete_by_prefix(VOICE_KEY_PREFIX).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_is_deterministic() {
        let first = cache_key("Merhaba", "narrator", "calm");
        let second = cache_key("Merhaba", "narrator", "calm");
        assert_eq!(first, second);
        assert!(first.starts_with(VOICE_KEY_PREFIX));
        // prefix + 64 hex chars of sha256
        assert_eq!(first.len(), VOICE_KEY_PREFIX.len() + 64);
    }

    #[test]
    fn test_cache_key_depends_on_every_field() {
        let base = cache_key("Merhaba", "narrator", "calm");
        assert_ne!(base, cache_key("Merhaba!", "narrator", "calm"));
        assert_ne!(base, cache_key("Merhaba", "wolf", "calm"));
        assert_ne!(base, cache_key("Merhaba", "narrator", "happy"));
        assert_ne!(
            cache_key("ab", "c", "calm"),
            cache_key("a", "bc", "calm")
        );
    }

    #[test]
    fn test_cache_key_separators_inside_fields() {
        assert_ne!(
            cache_key("a:b", "c", "calm"),
            cache_key("a", "b:c", "calm")
        );
        assert_ne!(
            cache_key("Merhaba", "wolf:calm", ""),
            cache_key("Merhaba", "wolf", "calm:")
        );
        assert_ne!(cache_key("", "", "a"), cache_key("a", "", ""));
    }

    #[test]
    fn test_entry_expiry() {
        let mut entry = CacheEntry::new("voice_a", "payload");
        let now = entry.stored_at;
        let ttl = Duration::from_secs(60);

        assert!(!entry.is_expired(ttl, now));
        assert!(!entry.is_expired(ttl, now + chrono::Duration::seconds(60)));
        assert!(entry.is_expired(ttl, now + chrono::Duration::seconds(61)));

        entry.stored_at = now + chrono::Duration::seconds(30);
        assert!(!entry.is_expired(ttl, now));
    }
}
