//! PersistenceGateway - 1 つの key に型付き JSON 値を読み書きする
//!
//! # 設計
//! - load: 読めない（壊れた・古い形式の）データは「値なし」扱い
//! - save / remove: gateway 内で直列化し、同じ key への書き込みは同時に 1 つだけ
//! - 自動リトライはしない

use std::marker::PhantomData;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use crate::domain::StoreError;
use crate::ports::KeyValueStore;

pub struct PersistenceGateway<T> {
    kv: Arc<dyn KeyValueStore>,
    key: String,
    write_lock: Arc<Mutex<()>>,
    _marker: PhantomData<fn() -> T>,
}

// derive だと `T: Clone` を要求してしまう
impl<T> Clone for PersistenceGateway<T> {
    fn clone(&self) -> Self {
        Self {
            kv: Arc::clone(&self.kv),
            key: self.key.clone(),
            write_lock: Arc::clone(&self.write_lock),
            _marker: PhantomData,
        }
    }
}

impl<T> PersistenceGateway<T>
where
    T: Serialize + DeserializeOwned,
{
    pub fn new(kv: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            kv,
            key: key.into(),
            write_lock: Arc::new(Mutex::new(())),
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// `Ok(None)` when nothing is stored or the stored text does not parse.
    pub async fn load(&self) -> Result<Option<T>, StoreError> {
        let raw = match self.kv.get(&self.key).await {
            Ok(raw) => raw,
            Err(e) => {
                error!(key = %self.key, error = %e, "load failed");
                return Err(e);
            }
        };
        let Some(raw) = raw else {
            debug!(key = %self.key, "nothing stored");
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(key = %self.key, error = %e, "ignoring unparseable stored value");
                Ok(None)
            }
        }
    }

    pub async fn save(&self, value: &T) -> Result<(), StoreError> {
        let text = serde_json::to_string(value)?;
        let _guard = self.write_lock.lock().await;
        self.kv.set(&self.key, text).await.inspect_err(|e| {
            error!(key = %self.key, error = %e, "save failed");
        })
    }

    pub async fn remove(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        self.kv.remove(&self.key).await.inspect_err(|e| {
            error!(key = %self.key, error = %e, "remove failed");
        })
    }
}
