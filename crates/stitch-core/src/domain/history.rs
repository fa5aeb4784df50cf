//! History entries recorded by the ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::HistoryId;

/// An immutable snapshot of a value at some point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry<V> {
    pub id: HistoryId,
    pub snapshot: V,
    pub captured_at: DateTime<Utc>,
    #[serde(default)]
    pub note: String,
}
