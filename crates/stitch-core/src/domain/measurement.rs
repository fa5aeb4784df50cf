//! Body measurements: an ordered map of field name -> numeric string.
//!
//! Values stay strings because that is what the forms (and the estimation
//! collaborator) hand us. A field counts as measured only when it parses to a
//! number greater than zero; blank, garbage and `0` all mean "not yet measured".

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::StoreError;
use super::value::{DomainValue, Loaded};

/// Fields every profile starts with.
pub const STANDARD_FIELDS: [&str; 11] = [
    "chest",
    "waist",
    "hips",
    "shoulders",
    "sleeveLength",
    "neck",
    "inseam",
    "thigh",
    "bicep",
    "wrist",
    "height",
];

/// Parse a measurement string. Missing, blank or non-finite input is `None`.
pub fn parse_measurement(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MeasurementSnapshot(BTreeMap<String, String>);

impl Default for MeasurementSnapshot {
    fn default() -> Self {
        Self::standard()
    }
}

impl MeasurementSnapshot {
    /// The eleven standard fields, all blank.
    pub fn standard() -> Self {
        Self(
            STANDARD_FIELDS
                .iter()
                .map(|f| (f.to_string(), String::new()))
                .collect(),
        )
    }

    pub fn empty() -> Self {
        Self(BTreeMap::new())
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn numeric(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(parse_measurement)
    }

    pub fn is_measured(&self, field: &str) -> bool {
        self.numeric(field).is_some_and(|v| v > 0.0)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Builder-style insert, used when a new snapshot is assembled.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    /// Overlay `partial` on top of this snapshot (partial wins).
    pub fn merged(&self, partial: &BTreeMap<String, String>) -> Self {
        let mut next = self.0.clone();
        for (k, v) in partial {
            next.insert(k.clone(), v.clone());
        }
        Self(next)
    }

    pub fn into_inner(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl From<BTreeMap<String, String>> for MeasurementSnapshot {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MeasurementSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// One field assignment, the record type of the measurement store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeasurementEntry {
    pub field: String,
    pub value: String,
}

/// Layout under `@user_measurements`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMeasurements {
    pub measurements: BTreeMap<String, String>,
    pub last_updated: DateTime<Utc>,
}

impl DomainValue for MeasurementSnapshot {
    type Key = String;
    type Record = MeasurementEntry;
    type Patch = String;
    type Stored = StoredMeasurements;

    const RECORD_NAME: &'static str = "measurement field";
    const STRICT_UPDATE: bool = true;

    /// Adds the field, or overwrites it when it already exists.
    fn append(&self, record: MeasurementEntry) -> Result<Self, StoreError> {
        if record.field.trim().is_empty() {
            return Err(StoreError::Validation(
                "measurement field name is empty".into(),
            ));
        }
        Ok(self.clone().with(record.field, record.value))
    }

    fn update(
        &self,
        key: &String,
        patch: &String,
        _now: DateTime<Utc>,
    ) -> Result<Option<Self>, StoreError> {
        if !self.0.contains_key(key) {
            return Ok(None);
        }
        Ok(Some(self.clone().with(key.clone(), patch.clone())))
    }

    fn remove(&self, key: &String) -> Option<Self> {
        let mut next = self.0.clone();
        next.remove(key).map(|_| Self(next))
    }

    fn to_stored(&self, saved_at: DateTime<Utc>) -> StoredMeasurements {
        StoredMeasurements {
            measurements: self.0.clone(),
            last_updated: saved_at,
        }
    }

    fn from_stored(stored: StoredMeasurements) -> Loaded<Self> {
        Loaded {
            value: Self(stored.measurements),
            last_updated: Some(stored.last_updated),
        }
    }
}
