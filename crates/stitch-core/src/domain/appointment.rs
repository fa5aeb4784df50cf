//! Appointment records and their status machine.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::StoreError;
use super::ids::AppointmentId;
use super::value::{DomainValue, Loaded};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    Consultation,
    Measurement,
    Fitting,
    Pickup,
}

/// Appointment status.
///
/// State transitions:
/// - Scheduled -> Confirmed
/// - Scheduled | Confirmed -> Completed | Cancelled
///
/// Completed and Cancelled are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }

    /// Staying in the same status is always allowed.
    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        self == next
            || matches!(
                (self, next),
                (Scheduled, Confirmed)
                    | (Scheduled | Confirmed, Completed)
                    | (Scheduled | Confirmed, Cancelled)
            )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: AppointmentId,
    #[serde(rename = "type")]
    pub kind: AppointmentType,
    pub date: NaiveDate,
    /// Slot label as picked in the booking form, e.g. "14:30" or "2:30 PM".
    pub time: String,
    pub client: Client,
    pub status: AppointmentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

const TIME_FORMATS: [&str; 4] = ["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M%p"];

/// Parse a slot label. Accepts 24h ("14:30") and 12h ("2:30 PM") forms.
pub fn parse_slot_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
}

impl Appointment {
    /// `date + time` as a comparable instant; `None` when the slot label is unreadable.
    pub fn starts_at(&self) -> Option<NaiveDateTime> {
        parse_slot_time(&self.time).map(|t| self.date.and_time(t))
    }
}

/// Booking form input; ids and timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppointmentDraft {
    pub kind: AppointmentType,
    pub date: NaiveDate,
    pub time: String,
    pub client: Client,
    #[serde(default)]
    pub notes: Option<String>,
}

impl AppointmentDraft {
    pub fn validate(&self) -> Result<(), StoreError> {
        let mut missing = Vec::new();
        if self.client.name.trim().is_empty() {
            missing.push("client name");
        }
        if self.client.phone.trim().is_empty() {
            missing.push("client phone");
        }
        if self.time.trim().is_empty() {
            missing.push("time");
        }
        if !missing.is_empty() {
            return Err(StoreError::Validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )));
        }
        if parse_slot_time(&self.time).is_none() {
            return Err(StoreError::Validation(format!(
                "unrecognised time slot: {}",
                self.time
            )));
        }
        Ok(())
    }

    pub fn into_appointment(self, id: AppointmentId, now: DateTime<Utc>) -> Appointment {
        Appointment {
            id,
            kind: self.kind,
            date: self.date,
            time: self.time.trim().to_string(),
            client: Client {
                name: self.client.name.trim().to_string(),
                phone: self.client.phone.trim().to_string(),
            },
            status: AppointmentStatus::Scheduled,
            notes: self.notes,
            created_at: now,
            updated_at: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentPatch {
    pub kind: Option<AppointmentType>,
    pub date: Option<NaiveDate>,
    pub time: Option<String>,
    pub client: Option<Client>,
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
}

impl AppointmentPatch {
    pub fn status(status: AppointmentStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    fn apply(&self, current: &Appointment, now: DateTime<Utc>) -> Result<Appointment, StoreError> {
        let mut next = current.clone();
        if let Some(status) = self.status {
            if !current.status.can_transition_to(status) {
                return Err(StoreError::InvalidTransition {
                    from: current.status.to_string(),
                    to: status.to_string(),
                });
            }
            next.status = status;
        }
        if let Some(time) = &self.time {
            if parse_slot_time(time).is_none() {
                return Err(StoreError::Validation(format!("unrecognised time slot: {time}")));
            }
            next.time = time.trim().to_string();
        }
        if let Some(kind) = self.kind {
            next.kind = kind;
        }
        if let Some(date) = self.date {
            next.date = date;
        }
        if let Some(client) = &self.client {
            next.client = client.clone();
        }
        if let Some(notes) = &self.notes {
            next.notes = Some(notes.clone());
        }
        next.updated_at = Some(now);
        Ok(next)
    }
}

/// Appointments in insertion order. Display order is a derived query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppointmentList(Vec<Appointment>);

impl AppointmentList {
    pub fn new(items: Vec<Appointment>) -> Self {
        Self(items)
    }

    pub fn get(&self, id: &AppointmentId) -> Option<&Appointment> {
        self.0.iter().find(|a| &a.id == id)
    }

    pub fn as_slice(&self) -> &[Appointment] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Appointment> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl DomainValue for AppointmentList {
    type Key = AppointmentId;
    type Record = Appointment;
    type Patch = AppointmentPatch;
    type Stored = Vec<Appointment>;

    const RECORD_NAME: &'static str = "appointment";
    const STRICT_UPDATE: bool = true;

    fn append(&self, record: Appointment) -> Result<Self, StoreError> {
        if self.get(&record.id).is_some() {
            return Err(StoreError::Validation(format!(
                "duplicate appointment id {}",
                record.id
            )));
        }
        let mut next = self.0.clone();
        next.push(record);
        Ok(Self(next))
    }

    fn update(
        &self,
        key: &AppointmentId,
        patch: &AppointmentPatch,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, StoreError> {
        let Some(pos) = self.0.iter().position(|a| &a.id == key) else {
            return Ok(None);
        };
        let mut next = self.0.clone();
        next[pos] = patch.apply(&self.0[pos], now)?;
        Ok(Some(Self(next)))
    }

    fn remove(&self, key: &AppointmentId) -> Option<Self> {
        let pos = self.0.iter().position(|a| &a.id == key)?;
        let mut next = self.0.clone();
        next.remove(pos);
        Some(Self(next))
    }

    fn to_stored(&self, _saved_at: DateTime<Utc>) -> Vec<Appointment> {
        self.0.clone()
    }

    fn from_stored(stored: Vec<Appointment>) -> Loaded<Self> {
        Loaded {
            last_updated: stored
                .iter()
                .map(|a| a.updated_at.unwrap_or(a.created_at))
                .max(),
            value: Self(stored),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use ulid::Ulid;
    use AppointmentStatus::*;

    fn draft() -> AppointmentDraft {
        AppointmentDraft {
            kind: AppointmentType::Fitting,
            date: NaiveDate::from_ymd_opt(2026, 10, 20).unwrap(),
            time: "2:30 PM".into(),
            client: Client {
                name: "Sam Rivera".into(),
                phone: "555-0100".into(),
            },
            notes: None,
        }
    }

    #[rstest]
    #[case::confirm(Scheduled, Confirmed, true)]
    #[case::complete(Confirmed, Completed, true)]
    #[case::cancel_scheduled(Scheduled, Cancelled, true)]
    #[case::same(Confirmed, Confirmed, true)]
    #[case::unconfirm(Confirmed, Scheduled, false)]
    #[case::resurrect_cancelled(Cancelled, Scheduled, false)]
    #[case::resurrect_completed(Completed, Confirmed, false)]
    #[case::complete_cancelled(Cancelled, Completed, false)]
    fn status_transitions(
        #[case] from: AppointmentStatus,
        #[case] to: AppointmentStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[rstest]
    #[case::twenty_four("14:30", 14, 30)]
    #[case::seconds("09:05:00", 9, 5)]
    #[case::twelve("2:30 PM", 14, 30)]
    #[case::twelve_compact("10:00AM", 10, 0)]
    fn slot_times_parse(#[case] raw: &str, #[case] hour: u32, #[case] minute: u32) {
        assert_eq!(
            parse_slot_time(raw),
            NaiveTime::from_hms_opt(hour, minute, 0)
        );
    }

    #[test]
    fn draft_without_client_fails_validation() {
        let mut d = draft();
        d.client.name = " ".into();
        d.client.phone.clear();

        let err = d.validate().unwrap_err();
        assert!(err.to_string().contains("client name, client phone"));
    }

    #[test]
    fn draft_with_bad_time_fails_validation() {
        let mut d = draft();
        d.time = "after lunch".into();
        assert!(matches!(d.validate(), Err(StoreError::Validation(_))));
    }

    #[test]
    fn patch_rejects_resurrection_and_leaves_list_intact() {
        let id = AppointmentId::from_ulid(Ulid::new());
        let mut appt = draft().into_appointment(id, Utc::now());
        appt.status = Cancelled;
        let list = AppointmentList::new(vec![appt.clone()]);

        let err = list
            .update(&id, &AppointmentPatch::status(Scheduled), Utc::now())
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));
        assert_eq!(list.get(&id), Some(&appt));
    }

    #[test]
    fn duplicate_append_is_rejected() {
        let id = AppointmentId::from_ulid(Ulid::new());
        let appt = draft().into_appointment(id, Utc::now());
        let list = AppointmentList::default().append(appt.clone()).unwrap();

        assert!(list.append(appt).is_err());
    }

    #[test]
    fn stored_json_uses_type_and_camel_case() {
        let id = AppointmentId::from_ulid(Ulid::new());
        let appt = draft().into_appointment(id, Utc::now());

        let json = serde_json::to_value(&appt).unwrap();
        assert_eq!(json["type"], "fitting");
        assert_eq!(json["status"], "scheduled");
        assert_eq!(json["client"]["name"], "Sam Rivera");
        assert!(json.get("createdAt").is_some());
        assert!(json.get("updatedAt").is_none());
    }
}
