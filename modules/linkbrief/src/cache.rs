use std::path::PathBuf;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::Result;

/// Stable cache key for a URL: SHA-256 hex digest, safe as a file name.
pub fn cache_key(url: &str) -> String {
    hex::encode(Sha256::digest(url.as_bytes()))
}

/// Key-value store for collaborator results, keyed per URL.
///
/// Entries are write-once: the pipeline treats a present entry as immutable
/// and never overwrites it. Forcing reprocessing of a URL means deleting its
/// entry out of band.
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn put(&self, key: &str, value: &str) -> Result<()>;
}

/// Filesystem cache: one JSON file per key under a fixed directory.
///
/// Writes go through a sibling temp file and a rename, so a crash mid-write
/// never leaves a torn entry behind.
pub struct FsCache {
    dir: PathBuf,
}

impl FsCache {
    /// Open (and create if needed) a cache directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait]
impl CacheStore for FsCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.entry_path(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn put(&self, key: &str, value: &str) -> Result<()> {
        let path = self.entry_path(key);
        let tmp = self.dir.join(format!("{key}.json.tmp"));
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(path = %path.display(), "Cache entry written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cache_key_is_stable_and_hex() {
        let a = cache_key("https://a.example");
        let b = cache_key("https://a.example");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn cache_key_distinguishes_urls() {
        assert_ne!(cache_key("https://a.example"), cache_key("https://b.example"));
    }

    #[tokio::test]
    async fn fs_cache_round_trip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cache = FsCache::open(dir.path().join("sources")).unwrap();

        let key = cache_key("https://a.example");
        assert!(cache.get(&key).await.unwrap().is_none());

        cache.put(&key, r#"{"hello":"world"}"#).await.unwrap();
        let value = cache.get(&key).await.unwrap().expect("entry present");
        assert_eq!(value, r#"{"hello":"world"}"#);
    }

    #[tokio::test]
    async fn fs_cache_leaves_no_temp_files() {
        let dir = tempfile::tempdir().expect("temp dir");
        let cache = FsCache::open(dir.path()).unwrap();
        cache.put(&cache_key("u"), "v").await.unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }
}
