//! MeasurementStore - 採寸値のファサード
//!
//! # 保存の流れ
//! - 入力中の編集（`update_measurements` など）は AutoPersistScheduler が debounce して保存
//! - `save_measurements` は保留中のタイマーを取り消し、即時保存してから履歴に追記
//! - 推定値の取り込みは明示保存と同じ扱い（履歴に残る）

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::StoreConfig;
use crate::domain::{
    Action, HistoryEntry, HistoryId, MeasurementEntry, MeasurementSnapshot, StoreError,
    StoreState, StoredMeasurements,
};
use crate::ports::{Clock, IdGenerator, KeyValueStore};
use crate::query::{self, CompletionSummary, FieldChange};
use crate::store::{AutoPersistScheduler, HistoryLedger, PersistenceGateway, Store};

pub const ESTIMATE_NOTE: &str = "estimate applied";

pub struct MeasurementStore {
    store: Arc<Store<MeasurementSnapshot>>,
    gateway: PersistenceGateway<StoredMeasurements>,
    autosave: Arc<AutoPersistScheduler<MeasurementSnapshot>>,
    history: HistoryLedger<MeasurementSnapshot>,
}

impl MeasurementStore {
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        config: &StoreConfig,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        let store = Arc::new(Store::new(Arc::clone(&clock)));
        let gateway = PersistenceGateway::new(Arc::clone(&kv), config.keys.measurements.clone());
        let autosave =
            AutoPersistScheduler::attach(&store, gateway.clone(), config.autosave_delay());
        let history = HistoryLedger::new(
            PersistenceGateway::new(kv, config.keys.measurement_history.clone()),
            config.history_capacity,
            clock,
            ids,
        );
        Self {
            store,
            gateway,
            autosave,
            history,
        }
    }

    /// The underlying store, for subscribing to changes.
    pub fn store(&self) -> &Arc<Store<MeasurementSnapshot>> {
        &self.store
    }

    pub fn state(&self) -> StoreState<MeasurementSnapshot> {
        self.store.state()
    }

    pub fn current(&self) -> MeasurementSnapshot {
        self.store.value()
    }

    /// Load the measurements and their history.
    ///
    /// A history that cannot be read is logged and starts out empty.
    pub async fn load(&self) -> StoreState<MeasurementSnapshot> {
        let state = self.store.load_from(&self.gateway).await;
        if let Err(e) = self.history.load().await {
            warn!(error = %e, "measurement history unavailable");
        }
        state
    }

    /// Merge `partial` into the current values. Written after the idle window.
    pub fn update_measurements(
        &self,
        partial: &BTreeMap<String, String>,
    ) -> Result<MeasurementSnapshot, StoreError> {
        let next = self.store.value().merged(partial);
        Ok(self.store.dispatch(Action::SetValue(next))?.value)
    }

    /// Set one existing field. Unknown fields are `NotFound`.
    pub fn update_measurement(
        &self,
        field: &str,
        value: impl Into<String>,
    ) -> Result<MeasurementSnapshot, StoreError> {
        let state = self.store.dispatch(Action::UpdateRecord {
            key: field.to_string(),
            patch: value.into(),
        })?;
        Ok(state.value)
    }

    /// Add a field outside the standard set (or overwrite one).
    pub fn add_field(
        &self,
        field: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<MeasurementSnapshot, StoreError> {
        let state = self.store.dispatch(Action::AppendRecord(MeasurementEntry {
            field: field.into(),
            value: value.into(),
        }))?;
        Ok(state.value)
    }

    /// Write the current values now and record them in the history.
    ///
    /// If the history cannot be written the measurements are still saved and
    /// the history error is returned.
    pub async fn save_measurements(
        &self,
        note: impl Into<String>,
    ) -> Result<HistoryEntry<MeasurementSnapshot>, StoreError> {
        self.autosave.cancel();
        let snapshot = self.store.value();
        self.store.persist_value(&self.gateway, &snapshot).await?;
        let entry = self.history.append(snapshot, note).await?;
        info!(id = %entry.id, "measurements saved");
        Ok(entry)
    }

    /// Take values from the estimation collaborator and save them with a history note.
    pub async fn apply_estimate(
        &self,
        estimate: &BTreeMap<String, String>,
    ) -> Result<HistoryEntry<MeasurementSnapshot>, StoreError> {
        self.update_measurements(estimate)?;
        self.save_measurements(ESTIMATE_NOTE).await
    }

    /// Reset to the blank standard set and drop the stored values and history.
    pub async fn clear_measurements(&self) -> Result<(), StoreError> {
        self.store
            .dispatch(Action::SetValue(MeasurementSnapshot::standard()))?;
        self.autosave.cancel();
        self.gateway.remove().await?;
        self.history.clear().await?;
        info!("measurements cleared");
        Ok(())
    }

    /// Newest first.
    pub fn history(&self) -> Vec<HistoryEntry<MeasurementSnapshot>> {
        self.history.list()
    }

    /// The snapshot recorded under `id`. The live values are not touched.
    pub fn restore_from_history(&self, id: &HistoryId) -> Result<MeasurementSnapshot, StoreError> {
        self.history.restore(id)
    }

    /// Replace the live values, e.g. with a restored snapshot.
    pub fn apply_snapshot(&self, snapshot: MeasurementSnapshot) -> Result<(), StoreError> {
        self.store.dispatch(Action::SetValue(snapshot))?;
        Ok(())
    }

    /// What changed between the history entry and the current values.
    pub fn compare_with_history(
        &self,
        id: &HistoryId,
    ) -> Result<BTreeMap<String, FieldChange>, StoreError> {
        let old = self.history.restore(id)?;
        Ok(query::diff(&old, &self.store.value()))
    }

    pub fn completion_summary(&self) -> CompletionSummary {
        query::completion_summary(&self.store.value())
    }

    /// Every field has a value greater than zero.
    pub fn is_complete(&self) -> bool {
        let summary = self.completion_summary();
        summary.total > 0 && summary.completed == summary.total
    }

    /// Write a pending auto-save now. `Ok(false)` when there was none.
    pub async fn flush(&self) -> Result<bool, StoreError> {
        self.autosave.flush().await
    }
}
