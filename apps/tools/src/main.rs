use std::{path::PathBuf, sync::Arc};

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use navigator_core::{
    drag::move_before, load_settings, load_settings_from, LifecycleEvent, MemoryRouter,
    RecordNavigable, StaffDirectory, StorageRemoteStore,
};
use shared::domain::RecordId;
use storage::NewRecord;

const SAMPLE_STAFF: &[(&str, &str, &str, bool, i64)] = &[
    ("Ann", "Walsh", "admin", true, 10),
    ("Amy", "Burke", "admin", true, 20),
    ("Owen", "Hale", "office", true, 10),
    ("Tess", "Moran", "tech", true, 10),
    ("Mo", "Quinn", "surgeon", true, 10),
    ("Olly", "Ward", "office", false, 10),
];

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://records.db")]
    database_url: String,
    /// Navigator settings file; `navigator.toml` is used when present.
    #[arg(long)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Inserts a small sample staff list.
    Seed,
    AddStaff {
        firstname: String,
        lastname: String,
        occupation: String,
        #[arg(long, default_value_t = 0)]
        priority: i64,
        #[arg(long)]
        invalid: bool,
    },
    List,
    /// Marks a staff member valid, or invalid with `--invalid`.
    SetValidity {
        id: i64,
        #[arg(long)]
        invalid: bool,
    },
    Delete {
        id: i64,
    },
    /// Drags a staff member in front of another one in the same group, or to
    /// the end of the group when `before` is omitted.
    Move {
        id: i64,
        before: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let cli = Cli::parse();
    let settings = match &cli.config {
        Some(path) => load_settings_from(path)?,
        None => load_settings()?,
    };
    let remote = StorageRemoteStore::connect(&cli.database_url, &settings.domain).await?;

    if let Command::Seed = &cli.command {
        for (firstname, lastname, occupation, valid, priority) in SAMPLE_STAFF {
            let record = NewRecord::new(*occupation, *valid, *priority)
                .with_attribute("firstname", *firstname)
                .with_attribute("lastname", *lastname);
            remote
                .storage()
                .insert_record(StaffDirectory::CONTEXT, &record)
                .await?;
        }
        println!("seeded {} staff", SAMPLE_STAFF.len());
        return Ok(());
    }

    if let Command::AddStaff {
        firstname,
        lastname,
        occupation,
        priority,
        invalid,
    } = &cli.command
    {
        let record = NewRecord::new(occupation.as_str(), !invalid, *priority)
            .with_attribute("firstname", firstname.as_str())
            .with_attribute("lastname", lastname.as_str());
        let id = remote
            .storage()
            .insert_record(StaffDirectory::CONTEXT, &record)
            .await?;
        println!("created staff id={id}");
        return Ok(());
    }

    let storage = remote.storage().clone();
    let router = Arc::new(MemoryRouter::new());
    let directory = StaffDirectory::new(settings, Arc::new(remote), router);
    directory.attach().await?;

    match cli.command {
        Command::Seed | Command::AddStaff { .. } => {}
        Command::List => {
            for record in directory.records().await {
                let name = |key: &str| {
                    record
                        .attributes
                        .get(key)
                        .and_then(|value| value.as_str())
                        .unwrap_or_default()
                        .to_string()
                };
                println!(
                    "{:>5} {:>6} {:<10} {:<5} {} {}",
                    record.id.0,
                    record.priority,
                    record.category,
                    if record.valid { "yes" } else { "no" },
                    name("firstname"),
                    name("lastname"),
                );
            }
            for (key, total) in directory.totals() {
                println!("group valid={} rank={:?}: {total}", key.valid, key.rank);
            }
        }
        Command::SetValidity { id, invalid } => {
            let record_id = RecordId(id);
            let mut record = storage
                .get_record(record_id)
                .await?
                .ok_or_else(|| anyhow!("staff id={id} not found"))?;
            record.valid = !invalid;
            storage.update_record(&record).await?;

            directory.select(record_id).await;
            directory
                .handle_event(LifecycleEvent::RecordChanged(record))
                .await;
            let key = directory.container_for(record_id).await;
            println!("id={id} now in group {key:?}");
        }
        Command::Delete { id } => {
            let record_id = RecordId(id);
            if !storage.delete_record(record_id).await? {
                return Err(anyhow!("staff id={id} not found"));
            }

            directory.select(record_id).await;
            directory.handle_event(LifecycleEvent::RecordDelete).await;
            println!(
                "deleted id={id}, selected id={}",
                directory.selected_id().await
            );
        }
        Command::Move { id, before } => {
            let dragged = RecordId(id);
            let key = directory
                .container_for(dragged)
                .await
                .ok_or_else(|| anyhow!("staff id={id} not found"))?;
            let order = directory.container(key).await;
            let reordered = move_before(&order, dragged, before.map(RecordId));
            let outcome = directory.complete_reorder(&reordered).await?;
            for change in &outcome.persisted {
                println!("id={} priority {} -> {}", change.id, change.from, change.to);
            }
            println!(
                "persisted {} priorities with step {}",
                outcome.persisted.len(),
                outcome.step
            );
        }
    }

    Ok(())
}
