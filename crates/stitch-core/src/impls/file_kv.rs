//! FileKeyValueStore - ディレクトリに 1 key = 1 ファイルで保存する KV
//!
//! 書き込みは一時ファイル → rename で行うので、途中で落ちても
//! 古い内容か新しい内容のどちらかが残ります。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use crate::domain::errors::StoreError;
use crate::ports::KeyValueStore;

pub struct FileKeyValueStore {
    dir: PathBuf,
}

impl FileKeyValueStore {
    /// Creates `dir` if needed.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await.map_err(|e| {
            StoreError::StorageUnavailable(format!("create {}: {e}", dir.display()))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `@user_measurements` -> `<dir>/user_measurements.json`
    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(key)))
    }
}

/// File name (without extension) a key is stored under.
///
/// Different keys can map to the same stem (`@cart` and `cart`), so keys that
/// must not collide are compared by stem.
pub fn file_stem(key: &str) -> String {
    key.trim_start_matches('@')
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

fn unavailable(op: &str, path: &Path, err: std::io::Error) -> StoreError {
    StoreError::StorageUnavailable(format!("{op} {}: {err}", path.display()))
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key);
        match fs::read_to_string(&path).await {
            Ok(text) => Ok(Some(text)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(unavailable("read", &path, e)),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value.as_bytes())
            .await
            .map_err(|e| unavailable("write", &tmp, e))?;
        fs::rename(&tmp, &path)
            .await
            .map_err(|e| unavailable("rename", &path, e))?;
        debug!(key, path = %path.display(), bytes = value.len(), "wrote key");
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key);
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(unavailable("remove", &path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn values_survive_reopening_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        {
            let kv = FileKeyValueStore::open(dir.path()).await.unwrap();
            kv.set("@appointments", "[]".into()).await.unwrap();
        }
        let kv = FileKeyValueStore::open(dir.path()).await.unwrap();
        assert_eq!(kv.get("@appointments").await.unwrap().as_deref(), Some("[]"));
        assert!(dir.path().join("appointments.json").exists());
    }

    #[tokio::test]
    async fn missing_key_reads_as_none_and_removes_cleanly() {
        let dir = tempfile::tempdir().unwrap();
        let kv = FileKeyValueStore::open(dir.path()).await.unwrap();

        assert_eq!(kv.get("@cart").await.unwrap(), None);
        kv.remove("@cart").await.unwrap();
    }

    #[tokio::test]
    async fn odd_characters_are_sanitised() {
        let dir = tempfile::tempdir().unwrap();
        let kv = FileKeyValueStore::open(dir.path()).await.unwrap();

        kv.set("@a/b c", "1".into()).await.unwrap();
        assert!(dir.path().join("a_b_c.json").exists());
    }

    #[test]
    fn distinct_keys_can_share_a_stem() {
        assert_eq!(file_stem("@cart"), file_stem("cart"));
        assert_eq!(file_stem("@a/b"), file_stem("@a_b"));
        assert_ne!(file_stem("@cart"), file_stem("@bag"));
    }
}
