//! stitch-core
//!
//! Client-side state management for the tailoring storefront.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, measurement, appointment, cart, history, state, errors）
//! - **ports**: 抽象化レイヤー（KeyValueStore, Clock, IdGenerator, StateListener）
//! - **store**: 汎用パターン（Store, PersistenceGateway, HistoryLedger, AutoPersistScheduler）
//! - **query**: 派生クエリ（純粋関数）
//! - **app**: ファサードと AppBuilder
//! - **impls**: 実装（InMemoryKeyValueStore, FileKeyValueStore）
//! - **config**: StoreConfig

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod query;
pub mod store;
