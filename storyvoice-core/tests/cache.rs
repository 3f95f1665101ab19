use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use storyvoice_core::cache::{
    cache_key, CacheEntry, FileCache, MemoryCache, ResponseCache, VoiceCache,
};
use storyvoice_core::settings::config::{CacheBackend, CacheSettings};
use tempfile::TempDir;

#[tokio::test]
async fn test_file_cache_round_trips_entries() {
    let dir = TempDir::new().unwrap();
    let cache = FileCache::new(dir.path().join("voices")).unwrap();

    let key = cache_key("Merhaba", "narrator", "calm");
    assert!(cache.get(&key).await.unwrap().is_none());

    let entry = CacheEntry::new(key.clone(), "data:audio/mpeg;base64,SUQz");
    cache.set(entry.clone()).await.unwrap();

    assert_eq!(cache.get(&key).await.unwrap(), Some(entry));
    assert!(cache.dir().join(format!("{key}.json")).exists());

    assert!(cache.delete(&key).await.unwrap());
    assert!(!cache.delete(&key).await.unwrap());
    assert!(cache.get(&key).await.unwrap().is_none());
}

#[tokio::test]
async fn test_file_cache_rejects_path_like_keys() {
    let dir = TempDir::new().unwrap();
    let cache = FileCache::new(dir.path().to_path_buf()).unwrap();

    assert!(cache.get("../outside").await.is_err());
    assert!(cache.set(CacheEntry::new("a/b", "x")).await.is_err());
    assert!(cache.delete("").await.is_err());
}

#[tokio::test]
async fn test_file_cache_prefix_scan_ignores_other_files() {
    let dir = TempDir::new().unwrap();
    let cache = FileCache::new(dir.path().to_path_buf()).unwrap();

    cache.set(CacheEntry::new("voice_a", "1")).await.unwrap();
    cache.set(CacheEntry::new("voice_b", "2")).await.unwrap();
    cache.set(CacheEntry::new("session_c", "3")).await.unwrap();
    std::fs::write(dir.path().join("voice_notes.txt"), "not an entry").unwrap();

    let mut keys = cache.keys_with_prefix("voice_").await.unwrap();
    keys.sort();
    assert_eq!(keys, vec!["voice_a", "voice_b"]);

    let deleted = cache.delete_by_prefix("voice_").await.unwrap();
    assert_eq!(deleted, vec!["voice_a", "voice_b"]);
    assert_eq!(cache.keys_with_prefix("").await.unwrap(), vec!["session_c"]);
}

#[tokio::test]
async fn test_clear_skips_stray_files_and_reports_removed_entries() {
    let dir = TempDir::new().unwrap();
    let backend = Arc::new(FileCache::new(dir.path().to_path_buf()).unwrap());
    let cache = VoiceCache::new(backend.clone(), None);

    cache.store("voice_abc", "payload").await.unwrap();
    std::fs::write(dir.path().join("voice_abc.bak.json"), "{}").unwrap();

    assert_eq!(
        backend.keys_with_prefix("voice_").await.unwrap(),
        vec!["voice_abc"]
    );
    assert_eq!(cache.clear().await.unwrap(), vec!["voice_abc"]);
    assert!(dir.path().join("voice_abc.bak.json").exists());
    assert!(backend.get("voice_abc").await.unwrap().is_none());
}

#[tokio::test]
async fn test_file_cache_overwrite_leaves_only_the_entry_file() {
    let dir = TempDir::new().unwrap();
    let cache = FileCache::new(dir.path().to_path_buf()).unwrap();

    cache.set(CacheEntry::new("voice_a", "first")).await.unwrap();
    cache.set(CacheEntry::new("voice_a", "second")).await.unwrap();

    assert_eq!(cache.get("voice_a").await.unwrap().unwrap().value, "second");
    let files: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(files, vec!["voice_a.json"]);
}

#[tokio::test]
async fn test_concurrent_writes_and_reads_never_see_partial_entries() {
    let dir = TempDir::new().unwrap();
    let cache = Arc::new(FileCache::new(dir.path().to_path_buf()).unwrap());
    let payload = "x".repeat(256 * 1024);
    cache
        .set(CacheEntry::new("voice_big", payload.clone()))
        .await
        .unwrap();

    let writer = {
        let cache = cache.clone();
        let payload = payload.clone();
        tokio::spawn(async move {
            for _ in 0..20 {
                cache
                    .set(CacheEntry::new("voice_big", payload.clone()))
                    .await
                    .unwrap();
            }
        })
    };

    for _ in 0..20 {
        let entry = cache.get("voice_big").await.unwrap().unwrap();
        assert_eq!(entry.value.len(), payload.len());
    }
    writer.await.unwrap();
}

#[tokio::test]
async fn test_file_cache_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let key = cache_key("Bir varmış", "grandmother", "mysterious");

    FileCache::new(dir.path().to_path_buf())
        .unwrap()
        .set(CacheEntry::new(key.clone(), "payload"))
        .await
        .unwrap();

    let reopened = VoiceCache::new(
        Arc::new(FileCache::new(dir.path().to_path_buf()).unwrap()),
        None,
    );
    assert_eq!(
        reopened.lookup(&key).await.unwrap().as_deref(),
        Some("payload")
    );
}

#[tokio::test]
async fn test_voice_cache_evicts_expired_entries() {
    let backend = Arc::new(MemoryCache::new());
    let cache = VoiceCache::new(backend.clone(), Some(Duration::from_secs(3600)));

    backend
        .set(CacheEntry {
            key: "voice_old".to_string(),
            value: "stale".to_string(),
            stored_at: Utc::now() - chrono::Duration::hours(2),
        })
        .await
        .unwrap();
    cache.store("voice_new", "fresh").await.unwrap();

    assert_eq!(cache.lookup("voice_old").await.unwrap(), None);
    assert!(backend.get("voice_old").await.unwrap().is_none());
    assert_eq!(
        cache.lookup("voice_new").await.unwrap().as_deref(),
        Some("fresh")
    );
}

#[tokio::test]
async fn test_voice_cache_without_ttl_keeps_old_entries() {
    let backend = Arc::new(MemoryCache::new());
    let cache = VoiceCache::new(backend.clone(), None);

    backend
        .set(CacheEntry {
            key: "voice_old".to_string(),
            value: "still here".to_string(),
            stored_at: Utc::now() - chrono::Duration::days(365),
        })
        .await
        .unwrap();

    assert_eq!(
        cache.lookup("voice_old").await.unwrap().as_deref(),
        Some("still here")
    );
}

#[tokio::test]
async fn test_voice_cache_clear_reports_removed_voice_keys() {
    let backend = Arc::new(MemoryCache::new());
    let cache = VoiceCache::new(backend.clone(), None);

    cache.store("voice_2", "b").await.unwrap();
    cache.store("voice_1", "a").await.unwrap();
    backend.set(CacheEntry::new("other", "c")).await.unwrap();

    assert_eq!(cache.clear().await.unwrap(), vec!["voice_1", "voice_2"]);
    assert_eq!(backend.len(), 1);
    assert!(cache.clear().await.unwrap().is_empty());
}

#[test]
fn test_voice_cache_from_file_settings() {
    let dir = TempDir::new().unwrap();
    let settings = CacheSettings {
        backend: CacheBackend::File,
        dir: Some(dir.path().join("nested").join("cache")),
        ttl_secs: 0,
    };

    let cache = VoiceCache::from_settings(&settings).unwrap();

    assert_eq!(cache.ttl(), None);
    assert!(dir.path().join("nested").join("cache").is_dir());
}

/// Memory store that refuses to delete one key.
struct StuckKey {
    inner: MemoryCache,
    stuck: &'static str,
}

#[async_trait]
impl ResponseCache for StuckKey {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        self.inner.get(key).await
    }

    async fn set(&self, entry: CacheEntry) -> Result<()> {
        self.inner.set(entry).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        if key == self.stuck {
            anyhow::bail!("permission denied");
        }
        self.inner.delete(key).await
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        self.inner.keys_with_prefix(prefix).await
    }
}

#[tokio::test]
async fn test_clear_reports_entries_removed_before_a_failed_delete() {
    let backend = Arc::new(StuckKey {
        inner: MemoryCache::new(),
        stuck: "voice_b",
    });
    let cache = VoiceCache::new(backend.clone(), None);

    for key in ["voice_a", "voice_b", "voice_c"] {
        cache.store(key, "payload").await.unwrap();
    }

    assert_eq!(cache.clear().await.unwrap(), vec!["voice_a", "voice_c"]);
    assert_eq!(
        backend.keys_with_prefix("voice_").await.unwrap(),
        vec!["voice_b"]
    );
}
