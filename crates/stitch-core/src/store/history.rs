//! HistoryLedger - 過去のスナップショットを新しい順に最大 N 件保持する
//!
//! # 設計原則
//! - 追加は常に先頭、溢れた分は末尾から捨てる
//! - 台帳全体を 1 つの key に保存する（切り詰めと保存が呼び出し側から見て一体）
//! - restore は値を返すだけで、ライブの値は変更しない

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::domain::{HistoryEntry, HistoryId, StoreError};
use crate::ports::{Clock, IdGenerator};
use crate::store::PersistenceGateway;

pub const DEFAULT_HISTORY_CAPACITY: usize = 20;

pub struct HistoryLedger<V> {
    gateway: PersistenceGateway<Vec<HistoryEntry<V>>>,
    entries: Mutex<Vec<HistoryEntry<V>>>,
    /// Serializes append/clear so writes land in the order they were made.
    write_lock: tokio::sync::Mutex<()>,
    capacity: usize,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl<V> HistoryLedger<V>
where
    V: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn new(
        gateway: PersistenceGateway<Vec<HistoryEntry<V>>>,
        capacity: usize,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            gateway,
            entries: Mutex::new(Vec::new()),
            write_lock: tokio::sync::Mutex::new(()),
            capacity,
            clock,
            ids,
        }
    }

    fn entries(&self) -> MutexGuard<'_, Vec<HistoryEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Replace the in-memory ledger with what storage holds.
    ///
    /// On a storage error the ledger is left empty and the error returned.
    pub async fn load(&self) -> Result<usize, StoreError> {
        let loaded = self.gateway.load().await;
        let mut entries = self.entries();
        match loaded {
            Ok(stored) => {
                *entries = stored.unwrap_or_default();
                entries.truncate(self.capacity);
                debug!(key = %self.gateway.key(), entries = entries.len(), "history loaded");
                Ok(entries.len())
            }
            Err(e) => {
                entries.clear();
                Err(e)
            }
        }
    }

    /// Record `snapshot` at the head and persist the whole ledger.
    ///
    /// If the write fails the entry stays in memory and the error is returned.
    pub async fn append(
        &self,
        snapshot: V,
        note: impl Into<String>,
    ) -> Result<HistoryEntry<V>, StoreError> {
        let _guard = self.write_lock.lock().await;
        let entry = HistoryEntry {
            id: self.ids.history_id(),
            snapshot,
            captured_at: self.clock.now(),
            note: note.into(),
        };
        let to_save = {
            let mut entries = self.entries();
            entries.insert(0, entry.clone());
            entries.truncate(self.capacity);
            entries.clone()
        };
        self.gateway.save(&to_save).await?;
        info!(key = %self.gateway.key(), id = %entry.id, entries = to_save.len(), "history entry recorded");
        Ok(entry)
    }

    /// Newest first.
    pub fn list(&self) -> Vec<HistoryEntry<V>> {
        self.entries().clone()
    }

    pub fn get(&self, id: &HistoryId) -> Option<HistoryEntry<V>> {
        self.entries().iter().find(|e| &e.id == id).cloned()
    }

    /// A copy of the entry's snapshot. Applying it is up to the caller.
    pub fn restore(&self, id: &HistoryId) -> Result<V, StoreError> {
        self.get(id)
            .map(|e| e.snapshot)
            .ok_or_else(|| StoreError::not_found("history entry", id))
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Drop every entry, in memory and in storage.
    pub async fn clear(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.entries().clear();
        self.gateway.remove().await
    }
}
