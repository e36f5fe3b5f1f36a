mod api;
mod config;
mod db;
mod error;
mod keys;
mod mapper;
mod pipeline;
#[cfg(test)]
mod testing;
mod trigger;

use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::Settings;
use crate::db::DocumentStore;
use crate::pipeline::Scraper;

#[derive(Parser)]
#[command(name = "lease_scraper", about = "Leasing API scraper: rents, units and floorplans")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape once and exit
    Run,
    /// Serve the on-demand trigger and run the daily schedule
    Serve,
    /// Show document counts per collection
    Stats,
    /// Print one stored document
    Get {
        /// Collection name (rents, units, floorplans)
        collection: String,
        /// Document key, e.g. "202" or "101_1705314600000"
        key: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load()?;
    info!(db = ?settings.db_path, api = ?settings.api_base, "Configuration loaded");

    let store = DocumentStore::open(&settings.db_path)?;
    store.init_schema()?;

    match cli.command {
        Commands::Run => {
            let scraper = Scraper::new(&settings.upstream()?, store);
            let summary = scraper.run().await?;
            println!(
                "Merged {} rents, {} units, {} floorplans.",
                summary.rents, summary.units, summary.floorplans
            );
        }
        Commands::Serve => {
            let at = settings.schedule_time()?;
            let scraper = Arc::new(Scraper::new(&settings.upstream()?, store));
            tokio::spawn(trigger::run_daily(Arc::clone(&scraper), at));
            trigger::serve(scraper, &settings.listen).await?;
        }
        Commands::Stats => {
            for collection in db::COLLECTIONS {
                println!("{:<11} {}", format!("{}:", collection), store.count(collection)?);
            }
        }
        Commands::Get { collection, key } => match store.get(&collection, &key)? {
            Some(doc) => println!("{}", serde_json::to_string_pretty(&doc)?),
            None => println!("No document {}/{}.", collection, key),
        },
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
