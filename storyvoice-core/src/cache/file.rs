use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::fs;

use super::{CacheEntry, ResponseCache};

/// Directory-backed cache: one JSON document per key, named `{key}.json`.
pub struct FileCache {
    dir: PathBuf,
}

impl FileCache {
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create cache directory {dir:?}"))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, key: &str) -> Result<PathBuf> {
        if !is_valid_key(key) {
            bail!("unsupported cache key {key:?}");
        }
        Ok(self.dir.join(format!("{key}.json")))
    }

    /// Temporary sibling of an entry file. Entries are written here first and
    /// renamed into place, so readers never observe a partial document.
    fn staging_path(&self, key: &str) -> PathBuf {
        let sequence = STAGING_SEQUENCE.fetch_add(1, Ordering::Relaxed);
        self.dir
            .join(format!(".{key}.{}.{sequence}.tmp", std::process::id()))
    }
}

static STAGING_SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[async_trait]
impl ResponseCache for FileCache {
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let path = self.entry_path(key)?;
        let json = match fs::read_to_string(&path).await {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).context("failed to read cache entry"),
        };
        let entry = serde_json::from_str(&json).context("failed to deserialize cache entry")?;
        Ok(Some(entry))
    }

    async fn set(&self, entry: CacheEntry) -> Result<()> {
        let path = self.entry_path(&entry.key)?;
        let json = serde_json::to_string(&entry).context("failed to serialize cache entry")?;

        let staging = self.staging_path(&entry.key);
        if let Err(e) = fs::write(&staging, json).await {
            let _ = fs::remove_file(&staging).await;
            return Err(e).context("failed to write cache entry");
        }
        if let Err(e) = fs::rename(&staging, &path).await {
            let _ = fs::remove_file(&staging).await;
            return Err(e).context("failed to move cache entry into place");
        }
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let path = self.entry_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e).context("failed to delete cache entry"),
        }
    }

    async fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut entries = fs::read_dir(&self.dir)
            .await
            .context("failed to read cache directory")?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .context("failed to read directory entry")?
        {
            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                tracing::warn!("Skipping cache file with non UTF-8 name {:?}", path);
                continue;
            };
            if !is_valid_key(key) {
                tracing::debug!("Ignoring foreign file in cache directory {:?}", path);
                continue;
            }
            if key.starts_with(prefix) {
                keys.push(key.to_string());
            }
        }

        Ok(keys)
    }
}
