//! # Storage Traits
//!
//! 本地键值存储 trait 及内存实现，语义上对应浏览器的 localStorage。

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::StorageResult;

/// 键值存储 trait
///
/// 所有值均为字符串；类型转换由 [`crate::SessionStore`] 负责。
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// 读取键值
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;

    /// 写入键值（覆盖）
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;

    /// 删除键
    async fn remove(&self, key: &str) -> StorageResult<()>;
}

/// 内存存储，进程退出即丢失
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 用已有键值初始化
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: RwLock::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// 当前条目数
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.entries
            .write()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get("a").await.unwrap(), None);

        store.set("a", "1").await.unwrap();
        store.set("a", "2").await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some("2".to_string()));
        assert_eq!(store.len(), 1);

        store.remove("a").await.unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_with_entries() {
        let store = MemoryStore::with_entries([("chatSessionId", "abc")]);
        let value = tokio_test::block_on(store.get("chatSessionId")).unwrap();
        assert_eq!(value, Some("abc".to_string()));
    }
}
