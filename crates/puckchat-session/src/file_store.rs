//! # JsonFileStore Implementation
//!
//! 基于单个 JSON 文件的键值存储实现。
//!
//! 文件内容为一个扁平的字符串对象:
//! ```text
//! {
//!   "chatSessionId": "0b6f7c1e-...",
//!   "quickOptionsCollapsed": "false"
//! }
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};
use crate::storage::KeyValueStore;

type Entries = BTreeMap<String, String>;

/// JSON 文件存储
///
/// 首次访问时加载文件并缓存在内存中；每次写入都会完整重写文件
/// （先写临时文件再 rename）。
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    cache: RwLock<Option<Entries>>,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    /// 创建存储，路径支持 `~` 展开
    pub fn new(path: impl AsRef<str>) -> Self {
        let expanded = shellexpand::tilde(path.as_ref()).into_owned();
        Self::from_path(PathBuf::from(expanded))
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(None),
            write_lock: Mutex::new(()),
        }
    }

    /// 存储文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_file(&self) -> StorageResult<Entries> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("Storage file {:?} does not exist yet", self.path);
                return Ok(Entries::new());
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(Entries::new());
        }

        match serde_json::from_str::<Entries>(&content) {
            Ok(entries) => Ok(entries),
            Err(e) => {
                let err = StorageError::corrupt(self.path.display().to_string(), e.to_string());
                warn!("{}; starting with empty storage", err);
                let backup = self.path.with_extension("json.corrupt");
                if let Err(e) = fs::rename(&self.path, &backup).await {
                    warn!("Failed to move corrupt storage file aside: {}", e);
                }
                Ok(Entries::new())
            }
        }
    }

    async fn entries(&self) -> StorageResult<Entries> {
        let cached = self.cache.read().clone();
        if let Some(entries) = cached {
            return Ok(entries);
        }

        let loaded = self.read_file().await?;
        let mut cache = self.cache.write();
        Ok(cache.get_or_insert(loaded).clone())
    }

    async fn write_file(&self, entries: &Entries) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let content = serde_json::to_string_pretty(entries)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, content).await?;
        fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    async fn mutate<F>(&self, f: F) -> StorageResult<()>
    where
        F: FnOnce(&mut Entries),
    {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.entries().await?;
        f(&mut entries);
        self.write_file(&entries).await?;
        *self.cache.write() = Some(entries);
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries().await?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.mutate(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
        .await
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.mutate(|entries| {
            entries.remove(key);
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_values_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("sub").join("storage.json");

        let store = JsonFileStore::from_path(&path);
        store.set("chatSessionId", "abc").await.unwrap();
        store.set("quickOptionsCollapsed", "true").await.unwrap();

        let reopened = JsonFileStore::from_path(&path);
        assert_eq!(
            reopened.get("chatSessionId").await.unwrap(),
            Some("abc".to_string())
        );
        assert_eq!(
            reopened.get("quickOptionsCollapsed").await.unwrap(),
            Some("true".to_string())
        );
    }

    #[tokio::test]
    async fn test_remove_persists() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("storage.json");

        let store = JsonFileStore::from_path(&path);
        store.set("k", "v").await.unwrap();
        store.remove("k").await.unwrap();

        let reopened = JsonFileStore::from_path(&path);
        assert_eq!(reopened.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_corrupt_file_recovers_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("storage.json");
        tokio::fs::write(&path, "{not json").await.unwrap();

        let store = JsonFileStore::from_path(&path);
        assert_eq!(store.get("chatSessionId").await.unwrap(), None);
        assert!(temp_dir.path().join("storage.json.corrupt").exists());

        store.set("chatSessionId", "fresh").await.unwrap();
        let reopened = JsonFileStore::from_path(&path);
        assert_eq!(
            reopened.get("chatSessionId").await.unwrap(),
            Some("fresh".to_string())
        );
    }
}
