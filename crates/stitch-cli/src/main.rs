//! stitch - command line front end for the tailoring stores
//!
//! Usage:
//!   stitch measure chest=40 waist=32 --note "first fitting"
//!   stitch book --kind fitting --date 2026-11-02 --time "2:30 PM" --name "Sam Rivera" --phone 555-0100
//!   stitch upcoming
//!
//! Environment variables:
//!   STITCH_DATA_DIR - directory holding the stored JSON (default: .stitch)
//!   STITCH_AUTOSAVE_DELAY_MS - idle window before edits are written (default: 2000)
//!   STITCH_HISTORY_CAPACITY - measurement history entries kept (default: 20)
//!   RUST_LOG - log filter (default: stitch_core=info)

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use stitch_core::app::{App, AppBuilder, NewCartItem};
use stitch_core::config::StoreConfig;
use stitch_core::domain::{
    Appointment, AppointmentDraft, AppointmentId, AppointmentType, CartLineId, Client, HistoryId,
};
use stitch_core::impls::FileKeyValueStore;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "stitch")]
#[command(about = "Measurements, appointments and cart for the tailoring storefront")]
#[command(version)]
struct Args {
    /// JSON config file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Data directory (overrides config and STITCH_DATA_DIR)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Completion, bookings and cart at a glance
    Status,

    /// Record measurements (field=value ...) and save them to the history
    Measure {
        #[arg(required = true, value_parser = parse_assignment)]
        values: Vec<(String, String)>,

        #[arg(long, default_value = "")]
        note: String,
    },

    /// List saved measurement snapshots, newest first
    History,

    /// Changes since a history entry
    Diff { id: HistoryId },

    /// Bring back a history entry and save it
    Restore { id: HistoryId },

    /// Book an appointment
    Book {
        #[arg(long, value_enum)]
        kind: KindArg,

        /// YYYY-MM-DD
        #[arg(long)]
        date: NaiveDate,

        /// HH:MM or h:mm AM/PM
        #[arg(long)]
        time: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        phone: String,

        #[arg(long)]
        notes: Option<String>,
    },

    Cancel { id: AppointmentId },

    Complete { id: AppointmentId },

    /// Scheduled appointments still ahead, soonest first
    Upcoming,

    /// Put a product in the cart
    CartAdd {
        #[arg(long)]
        product: String,

        #[arg(long)]
        name: String,

        #[arg(long)]
        price_cents: u64,

        #[arg(long, default_value_t = 1)]
        quantity: u32,

        /// Customization, e.g. --option collar=spread
        #[arg(long = "option", value_parser = parse_assignment)]
        options: Vec<(String, String)>,
    },

    CartRemove { id: CartLineId },

    /// Show the cart and its totals
    Cart,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Consultation,
    Measurement,
    Fitting,
    Pickup,
}

impl From<KindArg> for AppointmentType {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Consultation => AppointmentType::Consultation,
            KindArg::Measurement => AppointmentType::Measurement,
            KindArg::Fitting => AppointmentType::Fitting,
            KindArg::Pickup => AppointmentType::Pickup,
        }
    }
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("expected key=value, got {raw:?}")),
    }
}

fn load_config(args: &Args) -> Result<StoreConfig> {
    let config = match &args.config {
        Some(path) => StoreConfig::from_file(path)?,
        None => StoreConfig::default(),
    };
    let mut config = config.with_env_overrides()?;
    if let Some(dir) = &args.data_dir {
        config.data_dir = dir.clone();
    }
    Ok(config)
}

fn print_appointment(a: &Appointment) {
    println!(
        "{}  {} {:<8} {:<12} {} ({}) [{}]",
        a.id,
        a.date,
        a.time,
        format!("{:?}", a.kind).to_lowercase(),
        a.client.name,
        a.client.phone,
        a.status
    );
}

fn dollars(cents: u64) -> String {
    format!("${}.{:02}", cents / 100, cents % 100)
}

async fn run(app: &App, command: Command) -> Result<()> {
    match command {
        Command::Status => {
            let summary = app.measurements.completion_summary();
            println!(
                "measurements: {}/{} ({:.1}%)",
                summary.completed, summary.total, summary.completion_percentage
            );
            println!("history entries: {}", app.measurements.history().len());
            println!("upcoming appointments: {}", app.appointments.upcoming().len());
            let totals = app.cart.totals();
            println!(
                "cart: {} item(s), {}",
                totals.item_count,
                dollars(totals.subtotal_cents)
            );
        }
        Command::Measure { values, note } => {
            let partial: BTreeMap<String, String> = values.into_iter().collect();
            app.measurements.update_measurements(&partial)?;
            let entry = app
                .measurements
                .save_measurements(note)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("save", "measurements")))?;
            println!("saved {}", entry.id);
        }
        Command::History => {
            for entry in app.measurements.history() {
                let measured = entry
                    .snapshot
                    .fields()
                    .filter(|(name, _)| entry.snapshot.is_measured(name))
                    .count();
                println!(
                    "{}  {}  {} field(s)  {}",
                    entry.id,
                    entry.captured_at.format("%Y-%m-%d %H:%M"),
                    measured,
                    entry.note
                );
            }
        }
        Command::Diff { id } => {
            let changes = app.measurements.compare_with_history(&id)?;
            if changes.is_empty() {
                println!("no changes");
            }
            for (field, change) in changes {
                println!(
                    "{field}: {} -> {} ({:+})",
                    change.old, change.new, change.difference
                );
            }
        }
        Command::Restore { id } => {
            let snapshot = app.measurements.restore_from_history(&id)?;
            app.measurements.apply_snapshot(snapshot)?;
            let entry = app
                .measurements
                .save_measurements(format!("restored from {id}"))
                .await?;
            println!("restored {id} as {}", entry.id);
        }
        Command::Book {
            kind,
            date,
            time,
            name,
            phone,
            notes,
        } => {
            let draft = AppointmentDraft {
                kind: kind.into(),
                date,
                time,
                client: Client { name, phone },
                notes,
            };
            let booked = app
                .appointments
                .book(draft)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("book", "appointment")))?;
            print_appointment(&booked);
        }
        Command::Cancel { id } => print_appointment(&app.appointments.cancel(&id).await?),
        Command::Complete { id } => print_appointment(&app.appointments.complete(&id).await?),
        Command::Upcoming => {
            let upcoming = app.appointments.upcoming();
            if upcoming.is_empty() {
                println!("no upcoming appointments");
            }
            upcoming.iter().for_each(print_appointment);
        }
        Command::CartAdd {
            product,
            name,
            price_cents,
            quantity,
            options,
        } => {
            let line = app.cart.add_item(NewCartItem {
                product_id: product,
                name,
                unit_price_cents: price_cents,
                quantity,
                options: options.into_iter().collect(),
            })?;
            println!("{line}");
        }
        Command::CartRemove { id } => {
            if !app.cart.remove_item(&id)? {
                bail!("no cart line {id}");
            }
        }
        Command::Cart => {
            for item in app.cart.items() {
                let options: Vec<String> =
                    item.options.iter().map(|(k, v)| format!("{k}={v}")).collect();
                println!(
                    "{}  {} x{}  {}  {}",
                    item.id,
                    item.name,
                    item.quantity,
                    dollars(item.line_total_cents()),
                    options.join(", ")
                );
            }
            let totals = app.cart.totals();
            println!("total: {} item(s), {}", totals.item_count, dollars(totals.subtotal_cents));
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stitch_core=info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let config = load_config(&args)?;

    let storage = FileKeyValueStore::open(config.data_dir.clone())
        .await
        .with_context(|| format!("opening data directory {}", config.data_dir.display()))?;
    info!(data_dir = %config.data_dir.display(), "using file storage");

    let app = AppBuilder::new()
        .config(config)
        .storage(Arc::new(storage))
        .build()?;
    app.load_all().await;

    let result = run(&app, args.command).await;
    // 自動保存待ちの編集はプロセス終了前に書き出す
    app.flush_all().await?;
    result
}
