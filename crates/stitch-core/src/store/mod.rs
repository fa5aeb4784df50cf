//! Store - 汎用の状態管理パターン
//!
//! 依存順（葉から）:
//! - **gateway**: PersistenceGateway（1 key の型付き JSON 読み書き）
//! - **history**: HistoryLedger（上限つき、新しい順の履歴）
//! - **transition / state_store**: 純粋な遷移関数と Store
//! - **autosave**: AutoPersistScheduler（debounce 保存）

pub mod autosave;
pub mod gateway;
pub mod history;
pub mod state_store;
pub mod transition;

pub use self::autosave::{AutoPersistScheduler, DEFAULT_AUTOSAVE_DELAY};
pub use self::gateway::PersistenceGateway;
pub use self::history::{DEFAULT_HISTORY_CAPACITY, HistoryLedger};
pub use self::state_store::{Store, SubscriptionId};
pub use self::transition::transition;
