//! AppBuilder - ストア群の構築とワイヤリング
//!
//! # 方針
//! - ストアはグローバルに置かず、ここで明示的に組み立てて渡す
//! - 起動時検証（Fail-fast）: 設定の不備は build() で BuildError にする
//! - 時計と ID 生成は差し替え可能（テストでは FixedClock）

use std::sync::Arc;

use tracing::info;

use super::appointments::AppointmentBook;
use super::cart::CartStore;
use super::measurements::MeasurementStore;
use crate::config::StoreConfig;
use crate::domain::StoreError;
use crate::ports::{Clock, IdGenerator, KeyValueStore, SystemClock, UlidGenerator};

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let app = AppBuilder::new()
///     .config(StoreConfig::default())
///     .storage(Arc::new(FileKeyValueStore::open(".stitch").await?))
///     .build()?;
/// app.load_all().await;
/// ```
pub struct AppBuilder {
    config: StoreConfig,
    storage: Option<Arc<dyn KeyValueStore>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
}

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("No storage configured. Call .storage(...) before build().")]
    MissingStorage,

    #[error(transparent)]
    InvalidConfig(#[from] StoreError),
}

impl AppBuilder {
    pub fn new() -> Self {
        Self {
            config: StoreConfig::default(),
            storage: None,
            clock: None,
            ids: None,
        }
    }

    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn storage(mut self, storage: Arc<dyn KeyValueStore>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// # 検証
    /// - storage が設定されているか
    /// - config.validate() が通るか
    pub fn build(self) -> Result<App, BuildError> {
        let storage = self.storage.ok_or(BuildError::MissingStorage)?;
        self.config.validate()?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(Arc::clone(&clock))));

        Ok(App {
            measurements: MeasurementStore::new(
                Arc::clone(&storage),
                &self.config,
                Arc::clone(&clock),
                Arc::clone(&ids),
            ),
            appointments: AppointmentBook::new(
                Arc::clone(&storage),
                &self.config,
                Arc::clone(&clock),
                Arc::clone(&ids),
            ),
            cart: CartStore::new(storage, &self.config, clock, ids),
            config: self.config,
        })
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// App は 3 つのストアを束ねる
pub struct App {
    pub measurements: MeasurementStore,
    pub appointments: AppointmentBook,
    pub cart: CartStore,
    pub config: StoreConfig,
}

impl App {
    /// Load every store. Failures land in each store's error slot.
    pub async fn load_all(&self) {
        let (measurements, appointments, cart) = tokio::join!(
            self.measurements.load(),
            self.appointments.load(),
            self.cart.load(),
        );
        info!(
            measurements_failed = measurements.error.is_some(),
            appointments = appointments.value.len(),
            appointments_failed = appointments.error.is_some(),
            cart_failed = cart.error.is_some(),
            "stores loaded"
        );
    }

    /// Write any pending auto-saves. Call before shutting down.
    pub async fn flush_all(&self) -> Result<(), StoreError> {
        let measurements = self.measurements.flush().await;
        let cart = self.cart.flush().await;
        measurements?;
        cart?;
        Ok(())
    }
}
