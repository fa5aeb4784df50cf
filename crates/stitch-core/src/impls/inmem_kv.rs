//! InMemoryKeyValueStore - 開発・テスト用の KV
//!
//! # 学習ポイント
//! - Mutex で HashMap を守る（await をまたいでロックしない）
//! - 障害注入（読み書き失敗）で StorageUnavailable 経路をテストする
//! - key ごとの書き込み回数を数えて debounce をテストする

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::domain::errors::StoreError;
use crate::ports::KeyValueStore;

#[derive(Default)]
struct Inner {
    values: HashMap<String, String>,
    writes: HashMap<String, usize>,
}

/// InMemoryKeyValueStore はプロセス内だけで生きる KV
///
/// # 使用例
/// ```ignore
/// let kv = Arc::new(InMemoryKeyValueStore::new());
/// kv.set("@cart", "[]".into()).await?;
/// assert_eq!(kv.write_count("@cart"), 1);
/// ```
#[derive(Default)]
pub struct InMemoryKeyValueStore {
    inner: Mutex<Inner>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every subsequent `get` fail with `StorageUnavailable`.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent `set`/`remove` fail with `StorageUnavailable`.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful `set` calls for `key`.
    pub fn write_count(&self, key: &str) -> usize {
        self.lock().writes.get(key).copied().unwrap_or(0)
    }

    /// Raw stored text, bypassing failure injection.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.lock().values.get(key).cloned()
    }

    /// Seed raw text, e.g. to simulate data written by an older app version.
    pub fn put_raw(&self, key: &str, value: impl Into<String>) {
        self.lock().values.insert(key.to_string(), value.into());
    }

    fn check_writes(&self, op: &str, key: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::StorageUnavailable(format!(
                "{op} {key}: injected write failure"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::StorageUnavailable(format!(
                "get {key}: injected read failure"
            )));
        }
        Ok(self.lock().values.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.check_writes("set", key)?;
        let mut inner = self.lock();
        inner.values.insert(key.to_string(), value);
        *inner.writes.entry(key.to_string()).or_default() += 1;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.check_writes("remove", key)?;
        self.lock().values.remove(key);
        Ok(())
    }
}
