//! `sbom-archiver pending`: records awaiting a reconcile verdict.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use sbom_archiver_core::{config::store_url_from_env, InventoryRecord, RecordStore, SqliteStore};

/// Arguments for `sbom-archiver pending`.
#[derive(Args, Debug)]
pub struct PendingArgs {
    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl PendingArgs {
    pub fn run(self) -> Result<()> {
        let url = store_url_from_env().context("invalid configuration")?;
        let store = SqliteStore::from_connection_string(&url)
            .context("invalid store connection string")?;

        let mut records = store
            .fetch_pending()
            .context("failed to read pending records (run `sbom-archiver init-db` first)")?;
        records.sort_by(|a, b| a.key().to_string().cmp(&b.key().to_string()));

        if self.json {
            return print_json(&records);
        }
        print_table(&records, Utc::now());
        Ok(())
    }
}

#[derive(Serialize)]
struct PendingReport<'a> {
    count: usize,
    records: &'a [InventoryRecord],
}

fn print_json(records: &[InventoryRecord]) -> Result<()> {
    let report = PendingReport {
        count: records.len(),
        records,
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("failed to render pending JSON")?
    );
    Ok(())
}

#[derive(Tabled)]
struct PendingRow {
    #[tabled(rename = "collection")]
    collection: String,
    #[tabled(rename = "project")]
    project: String,
    #[tabled(rename = "build")]
    build: String,
    #[tabled(rename = "last updated")]
    updated: String,
}

fn print_table(records: &[InventoryRecord], now: DateTime<Utc>) {
    if records.is_empty() {
        println!("no pending records");
        return;
    }

    let rows: Vec<PendingRow> = records
        .iter()
        .map(|r| PendingRow {
            collection: r.collection_id.to_string(),
            project: r.project_id.to_string(),
            build: r.build_number.to_string(),
            updated: format_age(r.updated_at, now),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    println!("{} pending", records.len());
}

fn format_age(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let secs = (now - then).num_seconds().max(0);
    match secs {
        0..=59 => "just now".to_string(),
        60..=3_599 => format!("{}m ago", secs / 60),
        3_600..=86_399 => format!("{}h ago", secs / 3_600),
        _ => format!("{}d ago", secs / 86_400),
    }
}
