//! Derived queries: pure functions over store values.
//!
//! Nothing here caches or mutates; lists are small enough to recompute on
//! every call.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::domain::measurement::parse_measurement;
use crate::domain::{Appointment, AppointmentStatus, Cart, MeasurementSnapshot};

/// Keep the fields for which `predicate(name, parsed_value)` holds.
pub fn filter_by_field<P>(snapshot: &MeasurementSnapshot, mut predicate: P) -> MeasurementSnapshot
where
    P: FnMut(&str, Option<f64>) -> bool,
{
    snapshot
        .fields()
        .filter(|(name, raw)| predicate(name, parse_measurement(raw)))
        .collect()
}

/// Fields that still need a value.
pub fn missing_fields(snapshot: &MeasurementSnapshot) -> Vec<String> {
    snapshot
        .fields()
        .filter(|(name, _)| !snapshot.is_measured(name))
        .map(|(name, _)| name.to_string())
        .collect()
}

pub fn filter_records<'a, T, P>(records: &'a [T], mut predicate: P) -> Vec<&'a T>
where
    P: FnMut(&T) -> bool,
{
    records.iter().filter(|r| predicate(r)).collect()
}

pub fn by_status(appointments: &[Appointment], status: AppointmentStatus) -> Vec<&Appointment> {
    filter_records(appointments, |a| a.status == status)
}

/// Scheduled appointments strictly after `now`, soonest first.
///
/// Ties keep insertion order. Appointments whose time slot cannot be read are
/// left out.
pub fn upcoming_first(appointments: &[Appointment], now: NaiveDateTime) -> Vec<&Appointment> {
    let mut upcoming: Vec<(NaiveDateTime, &Appointment)> = appointments
        .iter()
        .filter(|a| a.status == AppointmentStatus::Scheduled)
        .filter_map(|a| a.starts_at().map(|at| (at, a)))
        .filter(|(at, _)| *at > now)
        .collect();
    // sort_by_key is stable
    upcoming.sort_by_key(|(at, _)| *at);
    upcoming.into_iter().map(|(_, a)| a).collect()
}

/// Completed appointments and ones whose slot has passed, most recent first.
pub fn past_appointments(appointments: &[Appointment], now: NaiveDateTime) -> Vec<&Appointment> {
    let mut past: Vec<(Option<NaiveDateTime>, &Appointment)> = appointments
        .iter()
        .map(|a| (a.starts_at(), a))
        .filter(|(at, a)| {
            a.status == AppointmentStatus::Completed || at.is_some_and(|at| at <= now)
        })
        .collect();
    past.sort_by(|(x, _), (y, _)| y.cmp(x));
    past.into_iter().map(|(_, a)| a).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldChange {
    pub old: f64,
    pub new: f64,
    pub difference: f64,
}

/// Per-field numeric changes from `old` to `new`.
///
/// Only fields present in `new` are compared; a field dropped from `new` does
/// not show up. Missing or unparseable values count as 0.
pub fn diff(old: &MeasurementSnapshot, new: &MeasurementSnapshot) -> BTreeMap<String, FieldChange> {
    new.fields()
        .filter_map(|(name, raw)| {
            let new_value = parse_measurement(raw).unwrap_or(0.0);
            let old_value = old.numeric(name).unwrap_or(0.0);
            (new_value != old_value).then(|| {
                (
                    name.to_string(),
                    FieldChange {
                        old: old_value,
                        new: new_value,
                        difference: new_value - old_value,
                    },
                )
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionSummary {
    pub completed: usize,
    pub total: usize,
    pub completion_percentage: f64,
}

pub fn completion_summary(snapshot: &MeasurementSnapshot) -> CompletionSummary {
    let total = snapshot.len();
    let completed = snapshot
        .fields()
        .filter(|(name, _)| snapshot.is_measured(name))
        .count();
    let completion_percentage = if total == 0 {
        0.0
    } else {
        completed as f64 / total as f64 * 100.0
    };
    CompletionSummary {
        completed,
        total,
        completion_percentage,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub item_count: u32,
    pub subtotal_cents: u64,
}

pub fn cart_totals(cart: &Cart) -> CartTotals {
    cart.items().iter().fold(
        CartTotals {
            item_count: 0,
            subtotal_cents: 0,
        },
        |acc, item| CartTotals {
            item_count: acc.item_count.saturating_add(item.quantity),
            subtotal_cents: acc.subtotal_cents.saturating_add(item.line_total_cents()),
        },
    )
}
