//! Status command handler

use crate::config::Config;
use crate::services::DatasetStore;
use anyhow::Context;

pub fn cmd_status(config: &Config) -> anyhow::Result<()> {
    let store = DatasetStore::from_config(&config.output);

    let summary = store.summary().with_context(|| {
        format!(
            "Failed to read accumulation: {}",
            store.accumulation_path().display()
        )
    })?;

    let Some(summary) = summary else {
        println!(
            "No accumulation at {} yet.",
            store.accumulation_path().display()
        );
        println!();
        println!("Start one with: manhwa-harvest harvest");
        return Ok(());
    };

    println!("Accumulation: {}", summary.path.display());
    println!("{:-<70}", "");
    println!("  Entries: {}", summary.rows);
    println!(
        "  Newest start year: {}",
        summary
            .newest_start_year
            .map_or_else(|| "?".to_string(), |y| y.to_string())
    );

    Ok(())
}
