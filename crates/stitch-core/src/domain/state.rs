//! State - ストアの状態とアクション
//!
//! # 状態遷移
//! - BeginLoad → LoadSucceeded | LoadFailed
//! - SetValue / AppendRecord / UpdateRecord / RemoveRecord（同期編集）
//! - BeginSave → SaveSucceeded | SaveFailed
//!
//! 遷移そのものは `store::transition` の純粋関数が行います。

use chrono::{DateTime, Utc};

use super::errors::StoreError;
use super::value::DomainValue;

/// Progress of the most recent durable write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveStatus {
    #[default]
    Idle,
    Saving,
    Saved { at: DateTime<Utc> },
    Failed,
}

/// Everything a UI reads from a store.
///
/// `loading` is true only while a load is outstanding.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreState<V> {
    pub value: V,
    pub loading: bool,
    pub error: Option<StoreError>,
    pub last_updated: Option<DateTime<Utc>>,
    pub save_status: SaveStatus,
}

impl<V: Default> Default for StoreState<V> {
    fn default() -> Self {
        Self::with_value(V::default())
    }
}

impl<V> StoreState<V> {
    pub fn with_value(value: V) -> Self {
        Self {
            value,
            loading: false,
            error: None,
            last_updated: None,
            save_status: SaveStatus::Idle,
        }
    }
}

/// Discrete inputs to the transition function.
#[derive(Debug, Clone)]
pub enum Action<V: DomainValue> {
    BeginLoad,
    LoadSucceeded {
        value: V,
        last_updated: Option<DateTime<Utc>>,
    },
    LoadFailed(StoreError),
    SetValue(V),
    AppendRecord(V::Record),
    UpdateRecord { key: V::Key, patch: V::Patch },
    RemoveRecord(V::Key),
    ClearError,
    BeginSave,
    SaveSucceeded,
    SaveFailed(StoreError),
}

/// Payload-free tag of an [`Action`], handed to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    BeginLoad,
    LoadSucceeded,
    LoadFailed,
    SetValue,
    AppendRecord,
    UpdateRecord,
    RemoveRecord,
    ClearError,
    BeginSave,
    SaveSucceeded,
    SaveFailed,
}

impl ActionKind {
    /// Local edits of the value (the ones auto-persist reacts to).
    pub fn is_edit(self) -> bool {
        matches!(
            self,
            ActionKind::SetValue
                | ActionKind::AppendRecord
                | ActionKind::UpdateRecord
                | ActionKind::RemoveRecord
        )
    }
}

impl<V: DomainValue> Action<V> {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::BeginLoad => ActionKind::BeginLoad,
            Action::LoadSucceeded { .. } => ActionKind::LoadSucceeded,
            Action::LoadFailed(_) => ActionKind::LoadFailed,
            Action::SetValue(_) => ActionKind::SetValue,
            Action::AppendRecord(_) => ActionKind::AppendRecord,
            Action::UpdateRecord { .. } => ActionKind::UpdateRecord,
            Action::RemoveRecord(_) => ActionKind::RemoveRecord,
            Action::ClearError => ActionKind::ClearError,
            Action::BeginSave => ActionKind::BeginSave,
            Action::SaveSucceeded => ActionKind::SaveSucceeded,
            Action::SaveFailed(_) => ActionKind::SaveFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::set(ActionKind::SetValue, true)]
    #[case::append(ActionKind::AppendRecord, true)]
    #[case::update(ActionKind::UpdateRecord, true)]
    #[case::remove(ActionKind::RemoveRecord, true)]
    #[case::load(ActionKind::LoadSucceeded, false)]
    #[case::save(ActionKind::SaveSucceeded, false)]
    #[case::clear(ActionKind::ClearError, false)]
    fn only_value_edits_count_as_edits(#[case] kind: ActionKind, #[case] expected: bool) {
        assert_eq!(kind.is_edit(), expected);
    }

    #[test]
    fn default_state_is_idle() {
        let state: StoreState<Vec<u8>> = StoreState::default();
        assert!(!state.loading);
        assert!(state.error.is_none());
        assert_eq!(state.save_status, SaveStatus::Idle);
    }
}
