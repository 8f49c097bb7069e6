use anyhow::{Context, Result};
use api::{AppConfig, AppState, init_tracing};
use ingest::COLLECTION_PREFIX;
use std::path::PathBuf;

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let csv_path = args
        .next()
        .map(PathBuf::from)
        .context("usage: build_index <resumes.csv> [--reset]")?;
    let reset = args.any(|a| a == "--reset");

    let config = AppConfig::load()?;
    init_tracing();

    println!("=== Résumé Index Build ===\n");

    let state = AppState::from_config(&config).await?;

    if reset {
        let deleted = state.builder.purge_collections(COLLECTION_PREFIX).await?;
        println!("Deleted {} existing collections", deleted.len());
    }

    let records = ingest::ingest_file(&csv_path).await?;
    let stats = state
        .builder
        .build_and_save(&records, &state.mapping_path)
        .await?;

    println!("{}", "-".repeat(20));
    println!("Processed: {} résumés", stats.num_resumes);
    println!("Chunks generated: {}", stats.num_chunks);
    println!(
        "Truncated résumés: {} ({:.1}%)",
        stats.truncated,
        stats.truncated_percent()
    );
    if stats.skipped > 0 {
        println!("Skipped duplicates: {}", stats.skipped);
    }
    println!("Mapping saved to {:?}", state.mapping_path);
    println!("{}", "-".repeat(20));

    Ok(())
}
