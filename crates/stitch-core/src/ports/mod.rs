//! Ports - 抽象化レイヤー
//!
//! 外部の協調者（永続 KV、時計、ID 生成）と、状態変化の購読者への
//! インターフェースを定義します。
//!
//! # 設計原則
//! - メモリ上の値がセッション中の正本
//! - 永続 KV は再起動時の唯一の情報源
//! - 時刻と ID は差し替え可能（テスト容易性）

pub mod clock;
pub mod id_generator;
pub mod kv_store;
pub mod listener;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::kv_store::KeyValueStore;
pub use self::listener::StateListener;
