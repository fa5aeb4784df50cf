//! Domain model (ids, values, state, errors).
//!
//! - value: 値の抽象（DomainValue）
//! - state: ストア状態とアクション
//! - measurement / appointment / cart: 3 つの具体的な値
//! - history: 履歴エントリ

pub mod appointment;
pub mod cart;
pub mod errors;
pub mod history;
pub mod ids;
pub mod measurement;
pub mod state;
pub mod value;

pub use self::appointment::{
    Appointment, AppointmentDraft, AppointmentList, AppointmentPatch, AppointmentStatus,
    AppointmentType, Client,
};
pub use self::cart::{Cart, CartItem, CartItemPatch};
pub use self::errors::{ErrorKind, StoreError};
pub use self::history::HistoryEntry;
pub use self::ids::{AppointmentId, CartLineId, HistoryId};
pub use self::measurement::{MeasurementEntry, MeasurementSnapshot, StoredMeasurements};
pub use self::state::{Action, ActionKind, SaveStatus, StoreState};
pub use self::value::{DomainValue, Loaded};
