//! DomainValue - ストアが保持する値の抽象
//!
//! 測定値マップ・予約リスト・カートはすべてこの trait を実装し、
//! 汎用の遷移関数（`store::transition`）から同じ形で扱われます。

use std::fmt::Debug;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::errors::StoreError;

/// What a value looks like after reading it back from storage.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<V> {
    pub value: V,
    pub last_updated: Option<DateTime<Utc>>,
}

/// A live payload owned by a store.
///
/// All operations are pure: they take `&self` and return a new value.
pub trait DomainValue:
    Clone + Debug + Default + PartialEq + Send + Sync + 'static
{
    /// Identifies one record inside the value (appointment id, field name, ...).
    type Key: Clone + Debug + std::fmt::Display + Send + Sync + 'static;
    type Record: Clone + Debug + Send + Sync + 'static;
    type Patch: Clone + Debug + Send + Sync + 'static;

    /// On-disk shape under the store's key.
    type Stored: Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Human name used in logs and `NotFound` errors.
    const RECORD_NAME: &'static str;

    /// `true`: updating a missing key is `NotFound`. `false`: it is a no-op.
    const STRICT_UPDATE: bool;

    fn append(&self, record: Self::Record) -> Result<Self, StoreError>;

    /// `Ok(None)` when `key` does not exist.
    fn update(
        &self,
        key: &Self::Key,
        patch: &Self::Patch,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, StoreError>;

    /// `None` when `key` does not exist.
    fn remove(&self, key: &Self::Key) -> Option<Self>;

    fn to_stored(&self, saved_at: DateTime<Utc>) -> Self::Stored;

    fn from_stored(stored: Self::Stored) -> Loaded<Self>;
}
