//! AutoPersistScheduler - 連続した編集を 1 回の書き込みにまとめる（debounce）
//!
//! # フロー
//! 1. 編集系の dispatch を listener として受け取り、`schedule(value)` する
//! 2. schedule のたびに世代番号を進め、新しいタイマーを開始する
//! 3. タイマーが発火したとき、自分の世代が最新なら最新の値を保存する
//!
//! 発火済みの保存は後から来た schedule で中断されません。
//! 書き込みは write_lock で直列化されるので、`flush` は実行中の保存の完了を待ちます。
//! アプリ終了までに発火しなかった編集は失われます（`flush` で回避できる）。

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{debug, warn};

use super::gateway::PersistenceGateway;
use super::state_store::Store;
use crate::domain::{ActionKind, DomainValue, StoreError, StoreState};
use crate::ports::{Clock, StateListener};

pub const DEFAULT_AUTOSAVE_DELAY: Duration = Duration::from_secs(2);

struct Pending<V> {
    generation: u64,
    value: Option<V>,
}

fn lock_pending<V>(pending: &Mutex<Pending<V>>) -> MutexGuard<'_, Pending<V>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct AutoPersistScheduler<V: DomainValue> {
    store: Weak<Store<V>>,
    gateway: PersistenceGateway<V::Stored>,
    delay: Duration,
    pending: Arc<Mutex<Pending<V>>>,
    /// Held for the whole of a write, by timers and by `flush`.
    write_lock: Arc<tokio::sync::Mutex<()>>,
    clock: Arc<dyn Clock>,
}

impl<V: DomainValue> AutoPersistScheduler<V> {
    /// Create a scheduler and subscribe it to `store`'s edits.
    ///
    /// The scheduler only holds a weak reference back to the store.
    pub fn attach(
        store: &Arc<Store<V>>,
        gateway: PersistenceGateway<V::Stored>,
        delay: Duration,
    ) -> Arc<Self> {
        let scheduler = Arc::new(Self {
            store: Arc::downgrade(store),
            gateway,
            delay,
            pending: Arc::new(Mutex::new(Pending {
                generation: 0,
                value: None,
            })),
            write_lock: Arc::new(tokio::sync::Mutex::new(())),
            clock: Arc::clone(store.clock()),
        });
        store.subscribe(scheduler.clone());
        scheduler
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn has_pending(&self) -> bool {
        lock_pending(&self.pending).value.is_some()
    }

    /// Supersede any pending timer with a new one for `value`.
    pub fn schedule(&self, value: V) {
        let generation = {
            let mut pending = lock_pending(&self.pending);
            if pending.value.is_some() {
                debug!(key = %self.gateway.key(), "pending autosave superseded");
            }
            pending.generation += 1;
            pending.value = Some(value);
            pending.generation
        };

        let Ok(handle) = Handle::try_current() else {
            warn!(key = %self.gateway.key(), "no async runtime; autosave skipped until flush");
            return;
        };
        let pending = Arc::clone(&self.pending);
        let write_lock = Arc::clone(&self.write_lock);
        let store = self.store.clone();
        let gateway = self.gateway.clone();
        let clock = Arc::clone(&self.clock);
        let delay = self.delay;
        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            let _guard = write_lock.lock().await;
            let value = {
                let mut pending = lock_pending(&pending);
                if pending.generation != generation {
                    return;
                }
                pending.value.take()
            };
            if let Some(value) = value {
                // 失敗は store の error スロットに反映済み
                let _ = write(&store, &gateway, clock.as_ref(), &value).await;
            }
        });
    }

    /// Drop the pending write, if any.
    pub fn cancel(&self) {
        let mut pending = lock_pending(&self.pending);
        pending.generation += 1;
        pending.value = None;
    }

    /// Write the pending value immediately. `Ok(false)` when nothing was pending.
    ///
    /// A timer write already under way is waited for first.
    pub async fn flush(&self) -> Result<bool, StoreError> {
        let _guard = self.write_lock.lock().await;
        let value = {
            let mut pending = lock_pending(&self.pending);
            pending.generation += 1;
            pending.value.take()
        };
        match value {
            Some(value) => write(&self.store, &self.gateway, self.clock.as_ref(), &value)
                .await
                .map(|()| true),
            None => Ok(false),
        }
    }
}

async fn write<V: DomainValue>(
    store: &Weak<Store<V>>,
    gateway: &PersistenceGateway<V::Stored>,
    clock: &dyn Clock,
    value: &V,
) -> Result<(), StoreError> {
    match store.upgrade() {
        Some(store) => store.persist_value(gateway, value).await,
        // store が先に破棄されていても、最後の値は書いておく
        None => gateway.save(&value.to_stored(clock.now())).await,
    }
}

impl<V: DomainValue> StateListener<V> for AutoPersistScheduler<V> {
    fn on_transition(&self, action: ActionKind, state: &StoreState<V>) {
        if action.is_edit() {
            self.schedule(state.value.clone());
        }
    }
}
