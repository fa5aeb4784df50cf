//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryKeyValueStore**: テスト・開発用の KV（障害注入つき）
//! - **FileKeyValueStore**: ディレクトリ上の JSON ファイル（CLI 用）

pub mod file_kv;
pub mod inmem_kv;

pub use self::file_kv::FileKeyValueStore;
pub use self::inmem_kv::InMemoryKeyValueStore;
