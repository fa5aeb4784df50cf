//! StateListener port - 状態遷移の購読
//!
//! ストアは dispatch が成功するたびに、登録順に同期で通知します。
//! 自動保存（AutoPersistScheduler）もこの購読者の一つです。

use crate::domain::{ActionKind, StoreState};

pub trait StateListener<V>: Send + Sync {
    fn on_transition(&self, action: ActionKind, state: &StoreState<V>);
}

/// Closures can subscribe directly.
impl<V, F> StateListener<V> for F
where
    F: Fn(ActionKind, &StoreState<V>) + Send + Sync,
{
    fn on_transition(&self, action: ActionKind, state: &StoreState<V>) {
        self(action, state)
    }
}
