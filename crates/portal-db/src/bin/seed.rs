//! # Tariff Seeder
//!
//! Loads the standard tariff book into a portal database.
//!
//! ## Usage
//! ```bash
//! # Seed ./portal.db with tariffs effective from 2000
//! cargo run -p portal-db --bin portal-seed
//!
//! # Seed a revision effective from 2026 into another file
//! cargo run -p portal-db --bin portal-seed -- --db ./data/portal.db --effective-year 2026
//! ```
//!
//! Re-running for the same effective year replaces those schedules; earlier
//! years are left untouched.

use anyhow::Context;
use chrono::{Datelike, Utc};
use clap::Parser;
use portal_core::TariffBook;
use portal_db::{Database, DbConfig};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "portal-seed", about = "Load the standard tariff book")]
struct Args {
    /// Database file path
    #[arg(short, long, default_value = "./portal.db")]
    db: PathBuf,

    /// First service year the schedules apply to
    #[arg(short, long, default_value_t = 2000)]
    effective_year: i32,

    /// Skip seeding when any schedule is already stored
    #[arg(long)]
    if_empty: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let db = Database::new(DbConfig::new(&args.db))
        .await
        .with_context(|| format!("opening {}", args.db.display()))?;
    let tariffs = db.tariffs();

    let existing = tariffs.count().await?;
    if args.if_empty && existing > 0 {
        info!(existing, "Tariffs already present, nothing to do");
        return Ok(());
    }

    let book = TariffBook::standard().context("building the standard tariff book")?;
    let saved = tariffs.seed(&book, args.effective_year, Utc::now()).await?;

    let current_year = Utc::now().year();
    let in_force = tariffs.load_book(current_year).await?.schedules().count();
    info!(
        saved,
        effective_year = args.effective_year,
        current_year,
        in_force,
        "Seed complete"
    );

    db.close().await;
    Ok(())
}
