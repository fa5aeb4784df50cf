//! The pure transition function: `(state, action, now) -> state`.

use chrono::{DateTime, Utc};

use crate::domain::{Action, DomainValue, SaveStatus, StoreError, StoreState};

/// State after a successful local edit: new value, no error, not loading.
fn edited<V: DomainValue>(state: &StoreState<V>, value: V, now: DateTime<Utc>) -> StoreState<V> {
    StoreState {
        value,
        loading: false,
        error: None,
        last_updated: Some(now),
        save_status: state.save_status,
    }
}

/// Compute the next state. On `Err` the caller keeps the current state.
///
/// - edits clear `error` and `loading`
/// - updating a missing key is `NotFound` for strict values, otherwise a no-op
/// - removing a missing key is always a no-op
pub fn transition<V: DomainValue>(
    state: &StoreState<V>,
    action: Action<V>,
    now: DateTime<Utc>,
) -> Result<StoreState<V>, StoreError> {
    let next = match action {
        Action::BeginLoad => StoreState {
            loading: true,
            ..state.clone()
        },
        Action::LoadSucceeded {
            value,
            last_updated,
        } => StoreState {
            value,
            loading: false,
            error: None,
            last_updated,
            save_status: SaveStatus::Idle,
        },
        Action::LoadFailed(err) => StoreState {
            value: V::default(),
            loading: false,
            error: Some(err),
            last_updated: None,
            save_status: SaveStatus::Idle,
        },
        Action::SetValue(value) => edited(state, value, now),
        Action::AppendRecord(record) => edited(state, state.value.append(record)?, now),
        Action::UpdateRecord { key, patch } => match state.value.update(&key, &patch, now)? {
            Some(value) => edited(state, value, now),
            None if V::STRICT_UPDATE => return Err(StoreError::not_found(V::RECORD_NAME, key)),
            None => state.clone(),
        },
        Action::RemoveRecord(key) => match state.value.remove(&key) {
            Some(value) => edited(state, value, now),
            None => state.clone(),
        },
        Action::ClearError => StoreState {
            error: None,
            ..state.clone()
        },
        Action::BeginSave => StoreState {
            save_status: SaveStatus::Saving,
            ..state.clone()
        },
        Action::SaveSucceeded => StoreState {
            save_status: SaveStatus::Saved { at: now },
            ..state.clone()
        },
        Action::SaveFailed(err) => StoreState {
            error: Some(err),
            save_status: SaveStatus::Failed,
            ..state.clone()
        },
    };
    Ok(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Cart, CartItem, CartItemPatch, CartLineId, MeasurementEntry, MeasurementSnapshot};
    use chrono::TimeZone;
    use rstest::rstest;
    use std::collections::BTreeMap;
    use ulid::Ulid;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap()
    }

    fn measurements() -> StoreState<MeasurementSnapshot> {
        StoreState::with_value(MeasurementSnapshot::standard())
    }

    fn line(quantity: u32) -> CartItem {
        CartItem {
            id: CartLineId::from_ulid(Ulid::new()),
            product_id: "shirt".into(),
            name: "Oxford shirt".into(),
            unit_price_cents: 8_500,
            quantity,
            options: BTreeMap::new(),
        }
    }

    #[rstest]
    #[case::set(Action::SetValue(MeasurementSnapshot::empty().with("chest", "40")))]
    #[case::append(Action::AppendRecord(MeasurementEntry { field: "calf".into(), value: "14".into() }))]
    #[case::update(Action::UpdateRecord { key: "chest".into(), patch: "41".into() })]
    #[case::remove(Action::RemoveRecord("height".into()))]
    fn edits_clear_error_and_loading(#[case] action: Action<MeasurementSnapshot>) {
        let mut state = measurements();
        state.loading = true;
        state.error = Some(StoreError::StorageUnavailable("offline".into()));

        let next = transition(&state, action, now()).unwrap();
        assert!(!next.loading);
        assert!(next.error.is_none());
        assert_eq!(next.last_updated, Some(now()));
    }

    #[test]
    fn strict_update_of_missing_key_is_not_found() {
        let state = measurements();
        let err = transition(
            &state,
            Action::UpdateRecord {
                key: "tail".into(),
                patch: "1".into(),
            },
            now(),
        )
        .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { .. }));
    }

    #[test]
    fn lenient_update_of_missing_key_is_a_no_op() {
        let state = StoreState::with_value(Cart::default().append(line(1)).unwrap());
        let next = transition(
            &state,
            Action::UpdateRecord {
                key: CartLineId::from_ulid(Ulid::new()),
                patch: CartItemPatch { quantity: 4 },
            },
            now(),
        )
        .unwrap();
        assert_eq!(next, state);
    }

    #[test]
    fn remove_twice_equals_remove_once() {
        let item = line(2);
        let id = item.id;
        let state = StoreState::with_value(Cart::default().append(item).unwrap());

        let once = transition(&state, Action::RemoveRecord(id), now()).unwrap();
        let twice = transition(&once, Action::RemoveRecord(id), now()).unwrap();
        assert_eq!(once, twice);
        assert!(twice.value.is_empty());
    }

    #[test]
    fn load_failure_falls_back_to_default_value() {
        let state = StoreState::with_value(MeasurementSnapshot::empty().with("chest", "40"));
        let err = StoreError::StorageUnavailable("offline".into());

        let next = transition(&state, Action::LoadFailed(err.clone()), now()).unwrap();
        assert_eq!(next.value, MeasurementSnapshot::standard());
        assert_eq!(next.error, Some(err));
        assert!(!next.loading);
    }

    #[test]
    fn load_cycle_toggles_loading() {
        let state = measurements();
        let loading = transition(&state, Action::BeginLoad, now()).unwrap();
        assert!(loading.loading);

        let loaded = transition(
            &loading,
            Action::LoadSucceeded {
                value: MeasurementSnapshot::empty(),
                last_updated: None,
            },
            now(),
        )
        .unwrap();
        assert!(!loaded.loading);
        assert!(loaded.value.is_empty());
    }

    #[test]
    fn save_failure_keeps_value_and_sets_error() {
        let state = StoreState::with_value(MeasurementSnapshot::empty().with("chest", "40"));
        let saving = transition(&state, Action::BeginSave, now()).unwrap();
        assert_eq!(saving.save_status, SaveStatus::Saving);

        let failed = transition(
            &saving,
            Action::SaveFailed(StoreError::StorageUnavailable("full".into())),
            now(),
        )
        .unwrap();
        assert_eq!(failed.value, state.value);
        assert_eq!(failed.save_status, SaveStatus::Failed);
        assert!(failed.error.is_some());

        let cleared = transition(&failed, Action::ClearError, now()).unwrap();
        assert!(cleared.error.is_none());
    }
}
