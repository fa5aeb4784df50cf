//! App - アプリケーション層
//!
//! store のパターンを組み合わせて、画面から使うファサードを提供します。
//!
//! # 主要コンポーネント
//! - **AppBuilder**: ストア群の構築とワイヤリング
//! - **MeasurementStore**: 採寸値（自動保存 + 履歴）
//! - **AppointmentBook**: 予約（即時保存、予約確定は保存成功が条件）
//! - **CartStore**: カート（自動保存）

pub mod appointments;
pub mod builder;
pub mod cart;
pub mod measurements;

// 主要な型を再エクスポート
pub use self::appointments::AppointmentBook;
pub use self::builder::{App, AppBuilder, BuildError};
pub use self::cart::{CartStore, NewCartItem};
pub use self::measurements::MeasurementStore;
