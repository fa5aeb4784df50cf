//! Store - 現在の状態を 1 つだけ持ち、dispatch で遷移させる
//!
//! # 設計
//! - dispatch は呼び出し順に適用され、1 回の遷移は他と交錯しない
//! - 遷移後、登録済みの listener に同期で通知する
//! - ロックは await をまたがない（load / persist はロックの外で待つ）

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, error, info};

use super::gateway::PersistenceGateway;
use super::transition::transition;
use crate::domain::{Action, DomainValue, StoreError, StoreState};
use crate::ports::{Clock, StateListener};

/// Handle returned by [`Store::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Listeners<V> {
    next_id: u64,
    entries: Vec<(SubscriptionId, Arc<dyn StateListener<V>>)>,
}

pub struct Store<V: DomainValue> {
    state: Mutex<StoreState<V>>,
    listeners: Mutex<Listeners<V>>,
    clock: Arc<dyn Clock>,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<V: DomainValue> Store<V> {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_state(StoreState::default(), clock)
    }

    pub fn with_state(state: StoreState<V>, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(state),
            listeners: Mutex::new(Listeners {
                next_id: 0,
                entries: Vec::new(),
            }),
            clock,
        }
    }

    pub fn state(&self) -> StoreState<V> {
        lock(&self.state).clone()
    }

    pub fn value(&self) -> V {
        lock(&self.state).value.clone()
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Apply `action`. On error the state is left unchanged and nobody is notified.
    pub fn dispatch(&self, action: Action<V>) -> Result<StoreState<V>, StoreError> {
        let kind = action.kind();
        let next = {
            let mut state = lock(&self.state);
            let next = transition(&state, action, self.clock.now()).inspect_err(|e| {
                debug!(record = V::RECORD_NAME, ?kind, error = %e, "transition rejected");
            })?;
            *state = next.clone();
            next
        };
        debug!(record = V::RECORD_NAME, ?kind, "dispatched");

        // 通知中に subscribe されてもデッドロックしないよう、先に複製する
        let listeners: Vec<_> = lock(&self.listeners)
            .entries
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener.on_transition(kind, &next);
        }
        Ok(next)
    }

    pub fn subscribe(&self, listener: Arc<dyn StateListener<V>>) -> SubscriptionId {
        let mut listeners = lock(&self.listeners);
        let id = SubscriptionId(listeners.next_id);
        listeners.next_id += 1;
        listeners.entries.push((id, listener));
        id
    }

    /// Returns whether the subscription existed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut listeners = lock(&self.listeners);
        let before = listeners.entries.len();
        listeners.entries.retain(|(sid, _)| *sid != id);
        listeners.entries.len() != before
    }

    /// Load from storage. Failures end up in the error slot with a default value.
    pub async fn load_from(&self, gateway: &PersistenceGateway<V::Stored>) -> StoreState<V> {
        // BeginLoad / LoadSucceeded / LoadFailed never fail to apply.
        let _ = self.dispatch(Action::BeginLoad);
        let action = match gateway.load().await {
            Ok(Some(stored)) => {
                let loaded = V::from_stored(stored);
                Action::LoadSucceeded {
                    value: loaded.value,
                    last_updated: loaded.last_updated,
                }
            }
            Ok(None) => Action::LoadSucceeded {
                value: V::default(),
                last_updated: None,
            },
            Err(e) => {
                error!(key = %gateway.key(), error = %e, "falling back to defaults");
                Action::LoadFailed(e)
            }
        };
        let _ = self.dispatch(action);
        let state = self.state();
        info!(key = %gateway.key(), failed = state.error.is_some(), "store loaded");
        state
    }

    /// Write the current value now.
    pub async fn persist(&self, gateway: &PersistenceGateway<V::Stored>) -> Result<(), StoreError> {
        let value = self.value();
        self.persist_value(gateway, &value).await
    }

    /// Write `value` and track the outcome in `save_status`.
    ///
    /// A failed write never rolls back the in-memory value.
    pub async fn persist_value(
        &self,
        gateway: &PersistenceGateway<V::Stored>,
        value: &V,
    ) -> Result<(), StoreError> {
        let _ = self.dispatch(Action::BeginSave);
        match gateway.save(&value.to_stored(self.clock.now())).await {
            Ok(()) => {
                let _ = self.dispatch(Action::SaveSucceeded);
                info!(key = %gateway.key(), "saved");
                Ok(())
            }
            Err(e) => {
                let _ = self.dispatch(Action::SaveFailed(e.clone()));
                Err(e)
            }
        }
    }
}
