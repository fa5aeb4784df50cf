//! Errors - エラー型と分類
//!
//! `StoreError` は状態の `error` スロットにもそのまま入るので、
//! `Clone + PartialEq` を保つためにメッセージは文字列で保持します。

use thiserror::Error;

/// ErrorKind はストアエラーの分類
///
/// - StorageUnavailable: 永続ストレージに到達できない
/// - Serialization: encode/decode の失敗（load 時は「値なし」として扱う）
/// - NotFound: 存在しない id の update / restore
/// - Validation: 呼び出し側の入力不備（予約の必須項目不足など）
/// - InvalidTransition: 予約ステータスの不正な遷移
/// - Config: 設定値の不備
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    StorageUnavailable,
    Serialization,
    NotFound,
    Validation,
    InvalidTransition,
    Config,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl StoreError {
    pub fn not_found(what: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            what,
            id: id.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::StorageUnavailable(_) => ErrorKind::StorageUnavailable,
            StoreError::Serialization(_) => ErrorKind::Serialization,
            StoreError::NotFound { .. } => ErrorKind::NotFound,
            StoreError::Validation(_) => ErrorKind::Validation,
            StoreError::InvalidTransition { .. } => ErrorKind::InvalidTransition,
            StoreError::Config(_) => ErrorKind::Config,
        }
    }

    /// Banner text shown to the user, e.g. "Failed to load appointments".
    pub fn user_message(&self, action: &str, subject: &str) -> String {
        match self.kind() {
            ErrorKind::NotFound => format!("Could not find the requested {subject}"),
            ErrorKind::Validation => self.to_string(),
            _ => format!("Failed to {action} {subject}"),
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for StoreError {
    fn from(err: std::io::Error) -> Self {
        StoreError::StorageUnavailable(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::storage(StoreError::StorageUnavailable("disk".into()), ErrorKind::StorageUnavailable)]
    #[case::serde(StoreError::Serialization("eof".into()), ErrorKind::Serialization)]
    #[case::missing(StoreError::not_found("appointment", "appt-1"), ErrorKind::NotFound)]
    #[case::validation(StoreError::Validation("name".into()), ErrorKind::Validation)]
    fn kind_matches_variant(#[case] err: StoreError, #[case] kind: ErrorKind) {
        assert_eq!(err.kind(), kind);
    }

    #[test]
    fn user_message_hides_storage_details() {
        let err = StoreError::StorageUnavailable("EACCES /data".into());
        assert_eq!(
            err.user_message("load", "measurements"),
            "Failed to load measurements"
        );
    }

    #[test]
    fn io_errors_map_to_storage_unavailable() {
        let err: StoreError = std::io::Error::other("boom").into();
        assert_eq!(err.kind(), ErrorKind::StorageUnavailable);
    }
}
