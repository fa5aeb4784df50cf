use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use stitch_core::app::{App, AppBuilder, NewCartItem};
use stitch_core::config::StoreConfig;
use stitch_core::domain::{AppointmentDraft, AppointmentStatus, AppointmentType, Client};
use stitch_core::impls::{FileKeyValueStore, InMemoryKeyValueStore};
use stitch_core::ports::{Clock, FixedClock};

fn clock() -> Arc<dyn Clock> {
    Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2026, 10, 18, 12, 0, 0).unwrap(),
    ))
}

async fn open_dir(dir: &std::path::Path) -> App {
    let storage = FileKeyValueStore::open(dir).await.unwrap();
    let app = AppBuilder::new()
        .config(StoreConfig {
            data_dir: dir.to_path_buf(),
            ..StoreConfig::default()
        })
        .storage(Arc::new(storage))
        .clock(clock())
        .build()
        .unwrap();
    app.load_all().await;
    app
}

fn fitting() -> AppointmentDraft {
    AppointmentDraft {
        kind: AppointmentType::Fitting,
        date: NaiveDate::from_ymd_opt(2026, 10, 25).unwrap(),
        time: "11:00".into(),
        client: Client {
            name: "Sam Rivera".into(),
            phone: "555-0100".into(),
        },
        notes: Some("bring the jacket".into()),
    }
}

#[tokio::test]
async fn everything_survives_a_restart() {
    let dir = tempfile::tempdir().unwrap();

    let (booked, entry) = {
        let app = open_dir(dir.path()).await;
        app.measurements
            .update_measurements(&BTreeMap::from([
                ("chest".to_string(), "40".to_string()),
                ("waist".to_string(), "32".to_string()),
            ]))
            .unwrap();
        let entry = app.measurements.save_measurements("first visit").await.unwrap();
        app.measurements.update_measurement("neck", "15.5").unwrap();

        let booked = app.appointments.book(fitting()).await.unwrap();
        app.appointments.confirm(&booked.id).await.unwrap();

        app.cart
            .add_item(NewCartItem {
                product_id: "wool-suit".into(),
                name: "Wool suit".into(),
                unit_price_cents: 65_000,
                quantity: 1,
                options: BTreeMap::from([("lapel".to_string(), "peak".to_string())]),
            })
            .unwrap();

        // neck と cart は自動保存待ち
        app.flush_all().await.unwrap();
        (booked, entry)
    };

    let app = open_dir(dir.path()).await;

    let measurements = app.measurements.current();
    assert_eq!(measurements.get("chest"), Some("40"));
    assert_eq!(measurements.get("neck"), Some("15.5"));
    assert_eq!(app.measurements.completion_summary().completed, 3);

    let history = app.measurements.history();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, entry.id);
    assert_eq!(history[0].snapshot.get("neck"), Some(""));

    let stored = app.appointments.get(&booked.id).unwrap();
    assert_eq!(stored.status, AppointmentStatus::Confirmed);
    assert_eq!(stored.notes.as_deref(), Some("bring the jacket"));
    assert!(app.appointments.upcoming().is_empty());
    assert_eq!(app.appointments.by_status(AppointmentStatus::Confirmed).len(), 1);

    assert_eq!(app.cart.totals().subtotal_cents, 65_000);
}

#[tokio::test]
async fn unflushed_autosave_is_lost_but_explicit_saves_are_not() {
    let kv = Arc::new(InMemoryKeyValueStore::new());
    let build = || {
        AppBuilder::new()
            .storage(kv.clone())
            .clock(clock())
            .build()
            .unwrap()
    };

    {
        let app = build();
        app.load_all().await;
        app.measurements.update_measurement("chest", "40").unwrap();
        app.measurements.save_measurements("").await.unwrap();
        app.measurements.update_measurement("chest", "41").unwrap();
        // flush せずに終了
    }

    let app = build();
    app.load_all().await;
    assert_eq!(app.measurements.current().get("chest"), Some("40"));
}

#[tokio::test]
async fn corrupt_data_loads_as_defaults() {
    let kv = Arc::new(InMemoryKeyValueStore::new());
    kv.put_raw("@appointments", "{ not json");
    kv.put_raw("@user_measurements", "[1, 2, 3]");

    let app = AppBuilder::new().storage(kv.clone()).build().unwrap();
    app.load_all().await;

    assert!(app.appointments.all().is_empty());
    assert!(app.appointments.state().error.is_none());
    assert_eq!(app.measurements.completion_summary().total, 11);
}

#[tokio::test]
async fn unreachable_storage_surfaces_load_errors() {
    let kv = Arc::new(InMemoryKeyValueStore::new());
    kv.fail_reads(true);

    let app = AppBuilder::new().storage(kv.clone()).build().unwrap();
    app.load_all().await;

    let state = app.appointments.state();
    let err = state.error.expect("load error recorded");
    assert_eq!(err.user_message("load", "appointments"), "Failed to load appointments");
    assert!(state.value.is_empty());
    assert!(!state.loading);
}
