//! AppointmentBook - 予約のファサード
//!
//! 予約の編集は自動保存を使わず、その場で保存します。
//! 新規予約だけは保存が成功するまで確定扱いにせず、失敗したら取り消します。

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::StoreConfig;
use crate::domain::{
    Action, Appointment, AppointmentDraft, AppointmentId, AppointmentList, AppointmentPatch,
    AppointmentStatus, StoreError, StoreState,
};
use crate::ports::{Clock, IdGenerator, KeyValueStore};
use crate::query;
use crate::store::{PersistenceGateway, Store};

pub struct AppointmentBook {
    store: Arc<Store<AppointmentList>>,
    gateway: PersistenceGateway<Vec<Appointment>>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
}

impl AppointmentBook {
    pub fn new(
        kv: Arc<dyn KeyValueStore>,
        config: &StoreConfig,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            store: Arc::new(Store::new(Arc::clone(&clock))),
            gateway: PersistenceGateway::new(kv, config.keys.appointments.clone()),
            clock,
            ids,
        }
    }

    pub fn store(&self) -> &Arc<Store<AppointmentList>> {
        &self.store
    }

    pub fn state(&self) -> StoreState<AppointmentList> {
        self.store.state()
    }

    pub async fn load(&self) -> StoreState<AppointmentList> {
        self.store.load_from(&self.gateway).await
    }

    /// Book a new appointment. Succeeds only once the booking is stored.
    ///
    /// If the write fails the appointment is taken back out of the list and
    /// the error stays in the state for the banner.
    pub async fn book(&self, draft: AppointmentDraft) -> Result<Appointment, StoreError> {
        draft.validate()?;
        let appointment = draft.into_appointment(self.ids.appointment_id(), self.clock.now());
        self.store
            .dispatch(Action::AppendRecord(appointment.clone()))?;

        if let Err(e) = self.store.persist(&self.gateway).await {
            warn!(id = %appointment.id, error = %e, "booking not stored; rolling back");
            self.store.dispatch(Action::RemoveRecord(appointment.id))?;
            self.store.dispatch(Action::SaveFailed(e.clone()))?;
            return Err(e);
        }
        info!(id = %appointment.id, date = %appointment.date, time = %appointment.time, "appointment booked");
        Ok(appointment)
    }

    /// Apply `patch` and save. A failed save keeps the change in memory.
    pub async fn update(
        &self,
        id: &AppointmentId,
        patch: AppointmentPatch,
    ) -> Result<Appointment, StoreError> {
        let state = self.store.dispatch(Action::UpdateRecord {
            key: *id,
            patch,
        })?;
        let updated = state
            .value
            .get(id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("appointment", id))?;
        self.store.persist(&self.gateway).await?;
        Ok(updated)
    }

    pub async fn confirm(&self, id: &AppointmentId) -> Result<Appointment, StoreError> {
        self.update(id, AppointmentPatch::status(AppointmentStatus::Confirmed))
            .await
    }

    pub async fn complete(&self, id: &AppointmentId) -> Result<Appointment, StoreError> {
        self.update(id, AppointmentPatch::status(AppointmentStatus::Completed))
            .await
    }

    pub async fn cancel(&self, id: &AppointmentId) -> Result<Appointment, StoreError> {
        self.update(id, AppointmentPatch::status(AppointmentStatus::Cancelled))
            .await
    }

    /// Delete the appointment. Returns whether it existed.
    pub async fn remove(&self, id: &AppointmentId) -> Result<bool, StoreError> {
        if self.store.value().get(id).is_none() {
            return Ok(false);
        }
        self.store.dispatch(Action::RemoveRecord(*id))?;
        self.store.persist(&self.gateway).await?;
        Ok(true)
    }

    pub fn get(&self, id: &AppointmentId) -> Option<Appointment> {
        self.store.value().get(id).cloned()
    }

    pub fn all(&self) -> Vec<Appointment> {
        self.store.value().as_slice().to_vec()
    }

    /// Scheduled appointments still ahead, soonest first.
    ///
    /// Slots are local wall-clock labels, so they are compared with the
    /// clock's local time.
    pub fn upcoming(&self) -> Vec<Appointment> {
        let list = self.store.value();
        query::upcoming_first(list.as_slice(), self.clock.now_local())
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn by_status(&self, status: AppointmentStatus) -> Vec<Appointment> {
        let list = self.store.value();
        query::by_status(list.as_slice(), status)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn past(&self) -> Vec<Appointment> {
        let list = self.store.value();
        query::past_appointments(list.as_slice(), self.clock.now_local())
            .into_iter()
            .cloned()
            .collect()
    }
}
