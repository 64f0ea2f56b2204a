use anyhow::{bail, Result};
use std::{env, fs};
use usage_service::{
    config::AppConfig,
    observability,
    store::{JsonlStore, ReadingStore},
};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: backfill_readings <csv_file_path>");
    }
    let file_path = &args[1];

    // Load configuration (can point USAGE_CONFIG to a backfill-specific file).
    let cfg = AppConfig::load()?;

    let text = fs::read_to_string(file_path)?;
    let readings = elec_core::parse_csv_str(&text)?;

    let store = JsonlStore::new(&cfg.storage.readings_path);
    let appended = store.append(&readings).await?;

    tracing::info!(
        file = %file_path,
        appended,
        readings_path = %cfg.storage.readings_path,
        "backfill complete"
    );

    Ok(())
}
