//! Configuration for the stores.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::StoreError;
use crate::impls::file_kv::file_stem;
use crate::store::{DEFAULT_AUTOSAVE_DELAY, DEFAULT_HISTORY_CAPACITY};

/// Storage keys, one per domain. No two stores may share a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageKeys {
    #[serde(default = "default_measurements_key")]
    pub measurements: String,

    #[serde(default = "default_history_key")]
    pub measurement_history: String,

    #[serde(default = "default_appointments_key")]
    pub appointments: String,

    #[serde(default = "default_cart_key")]
    pub cart: String,
}

impl Default for StorageKeys {
    fn default() -> Self {
        Self {
            measurements: default_measurements_key(),
            measurement_history: default_history_key(),
            appointments: default_appointments_key(),
            cart: default_cart_key(),
        }
    }
}

fn default_measurements_key() -> String {
    "@user_measurements".to_string()
}

fn default_history_key() -> String {
    "@measurement_history".to_string()
}

fn default_appointments_key() -> String {
    "@appointments".to_string()
}

fn default_cart_key() -> String {
    "@cart".to_string()
}

fn default_history_capacity() -> usize {
    DEFAULT_HISTORY_CAPACITY
}

fn default_autosave_delay_ms() -> u64 {
    DEFAULT_AUTOSAVE_DELAY.as_millis() as u64
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".stitch")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum number of measurement history entries kept
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Idle window before an incidental edit is written
    #[serde(default = "default_autosave_delay_ms")]
    pub autosave_delay_ms: u64,

    #[serde(default)]
    pub keys: StorageKeys,

    /// Directory used by the file-backed store
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            autosave_delay_ms: default_autosave_delay_ms(),
            keys: StorageKeys::default(),
            data_dir: default_data_dir(),
        }
    }
}

impl StoreConfig {
    pub fn autosave_delay(&self) -> Duration {
        Duration::from_millis(self.autosave_delay_ms)
    }

    /// Read a JSON config file. Missing fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, StoreError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Config(format!("read {}: {e}", path.display())))?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| StoreError::Config(format!("parse {}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `STITCH_DATA_DIR`, `STITCH_AUTOSAVE_DELAY_MS` and `STITCH_HISTORY_CAPACITY`.
    pub fn with_env_overrides(self) -> Result<Self, StoreError> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, StoreError> {
        if let Some(dir) = lookup("STITCH_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(ms) = lookup("STITCH_AUTOSAVE_DELAY_MS") {
            self.autosave_delay_ms = ms
                .parse()
                .map_err(|e| StoreError::Config(format!("STITCH_AUTOSAVE_DELAY_MS={ms}: {e}")))?;
        }
        if let Some(cap) = lookup("STITCH_HISTORY_CAPACITY") {
            self.history_capacity = cap
                .parse()
                .map_err(|e| StoreError::Config(format!("STITCH_HISTORY_CAPACITY={cap}: {e}")))?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.history_capacity == 0 {
            return Err(StoreError::Config("history_capacity must be at least 1".into()));
        }
        let keys = [
            &self.keys.measurements,
            &self.keys.measurement_history,
            &self.keys.appointments,
            &self.keys.cart,
        ];
        // file-backed storage sanitizes keys, so compare what ends up on disk
        let stems: Vec<String> = keys.iter().map(|k| file_stem(k)).collect();
        for (i, key) in keys.iter().enumerate() {
            if stems[i].is_empty() {
                return Err(StoreError::Config(format!("storage key {key:?} is empty")));
            }
            if let Some(other) = (i + 1..keys.len()).find(|&j| stems[j] == stems[i]) {
                return Err(StoreError::Config(format!(
                    "storage keys {key} and {} share the file {}.json",
                    keys[other], stems[i]
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    #[test]
    fn defaults_match_the_persisted_layout() {
        let config = StoreConfig::default();
        assert_eq!(config.history_capacity, 20);
        assert_eq!(config.autosave_delay(), Duration::from_secs(2));
        assert_eq!(config.keys.measurements, "@user_measurements");
        assert_eq!(config.keys.measurement_history, "@measurement_history");
        assert_eq!(config.keys.appointments, "@appointments");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stitch.json");
        std::fs::write(&path, r#"{ "history_capacity": 5, "keys": { "cart": "@bag" } }"#).unwrap();

        let config = StoreConfig::from_file(&path).unwrap();
        assert_eq!(config.history_capacity, 5);
        assert_eq!(config.keys.cart, "@bag");
        assert_eq!(config.keys.appointments, "@appointments");
        assert_eq!(config.autosave_delay_ms, 2_000);
    }

    #[test]
    fn overrides_are_applied_and_validated() {
        let env = HashMap::from([
            ("STITCH_AUTOSAVE_DELAY_MS", "250"),
            ("STITCH_DATA_DIR", "/tmp/stitch"),
        ]);
        let config = StoreConfig::default()
            .with_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.autosave_delay(), Duration::from_millis(250));
        assert_eq!(config.data_dir, PathBuf::from("/tmp/stitch"));

        let bad = StoreConfig::default()
            .with_overrides(|k| (k == "STITCH_HISTORY_CAPACITY").then(|| "0".to_string()));
        assert!(matches!(bad, Err(StoreError::Config(_))));
    }

    #[rstest]
    #[case::identical("@appointments", "@appointments")]
    #[case::prefix_only("@cart", "cart")]
    #[case::sanitized("@a/b", "@a_b")]
    fn keys_sharing_a_file_are_rejected(#[case] cart: &str, #[case] appointments: &str) {
        let mut config = StoreConfig::default();
        config.keys.cart = cart.into();
        config.keys.appointments = appointments.into();
        assert!(matches!(config.validate(), Err(StoreError::Config(_))));
    }

    #[rstest]
    #[case::empty("")]
    #[case::only_prefix("@")]
    fn empty_keys_are_rejected(#[case] key: &str) {
        let mut config = StoreConfig::default();
        config.keys.cart = key.into();
        assert!(config.validate().is_err());
    }
}
