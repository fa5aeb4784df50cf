//! IdGenerator port - ID 生成の抽象化
//!
//! # 実装
//! - **UlidGenerator**: Clock の時刻 + ランダム部で ULID を作る

use std::sync::Arc;

use ulid::Ulid;

use crate::domain::ids::{AppointmentId, CartLineId, HistoryId};
use crate::ports::Clock;

/// IdGenerator は ULID ベースの ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（タイマータスクからも使える）
pub trait IdGenerator: Send + Sync {
    fn history_id(&self) -> HistoryId;

    fn appointment_id(&self) -> AppointmentId;

    fn cart_line_id(&self) -> CartLineId;
}

/// UlidGenerator は Clock を使って現在時刻ベースの ULID を生成します。
/// テストで FixedClock を渡すと timestamp 部分が固定されます。
pub struct UlidGenerator {
    clock: Arc<dyn Clock>,
}

impl UlidGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    fn next(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl IdGenerator for UlidGenerator {
    fn history_id(&self) -> HistoryId {
        HistoryId::from_ulid(self.next())
    }

    fn appointment_id(&self) -> AppointmentId {
        AppointmentId::from_ulid(self.next())
    }

    fn cart_line_id(&self) -> CartLineId {
        CartLineId::from_ulid(self.next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};

    #[test]
    fn generates_unique_ids() {
        let id_gen = UlidGenerator::new(Arc::new(SystemClock));

        let id1 = id_gen.history_id();
        let id2 = id_gen.history_id();
        let id3 = id_gen.history_id();

        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert_ne!(id1, id3);
    }

    #[test]
    fn fixed_clock_pins_the_timestamp_part() {
        let fixed_time = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(Arc::new(FixedClock::new(fixed_time)));

        let id1 = id_gen.appointment_id();
        let id2 = id_gen.appointment_id();

        // ランダム部分があるので ID は異なる
        assert_ne!(id1, id2);
        assert_eq!(id1.as_ulid().timestamp_ms(), fixed_time.timestamp_millis() as u64);
        assert_eq!(id2.as_ulid().timestamp_ms(), fixed_time.timestamp_millis() as u64);
    }

    #[test]
    fn prefixes_follow_the_id_type() {
        let id_gen = UlidGenerator::new(Arc::new(SystemClock));

        assert!(id_gen.history_id().to_string().starts_with("hist-"));
        assert!(id_gen.appointment_id().to_string().starts_with("appt-"));
        assert!(id_gen.cart_line_id().to_string().starts_with("line-"));
    }
}
