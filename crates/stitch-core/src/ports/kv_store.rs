//! KeyValueStore port - 永続ストレージ（端末ローカルの KV）
//!
//! アプリ再起動をまたいで値を保持する外部ストレージの境界です。
//! 値は JSON 文字列としてそのまま保存されます（解釈は gateway 側）。
//!
//! # 実装
//! - InMemoryKeyValueStore（テスト・開発用）
//! - FileKeyValueStore（ディレクトリに 1 key = 1 ファイル）

use async_trait::async_trait;

use crate::domain::errors::StoreError;

/// KeyValueStore は文字列 key で文字列値を読み書きする
///
/// # 設計原則
/// - すべて非同期
/// - 失敗は `StoreError::StorageUnavailable`
/// - 存在しない key の `get` は `Ok(None)`、`remove` は成功扱い
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;

    async fn remove(&self, key: &str) -> Result<(), StoreError>;
}
