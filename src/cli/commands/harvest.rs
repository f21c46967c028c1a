//! Harvest command handler

use crate::clients::AnilistClient;
use crate::config::Config;
use crate::services::{
    DatasetStore, FetchOptions, Fetcher, HarvestReport, Harvester, RunOutcome, StopReason,
};

pub async fn cmd_harvest(config: &Config) -> anyhow::Result<()> {
    let client = AnilistClient::new(&config.anilist);
    let fetcher = Fetcher::new(client, FetchOptions::from_config(config));
    let store = DatasetStore::from_config(&config.output);
    let harvester = Harvester::new(fetcher, store);

    let today = chrono::Local::now().date_naive();
    let report = harvester.run(today).await;

    print_report(&report);
    Ok(())
}

fn print_report(report: &HarvestReport) {
    println!("Harvest Summary");
    println!("{:-<70}", "");
    println!("  Known before run: {}", report.known);
    println!("  New entries fetched: {}", report.fetched);

    match &report.stop_reason {
        StopReason::Exhausted => println!("  Stopped: no more pages"),
        StopReason::CapReached => println!("  Stopped: limit reached"),
        StopReason::Aborted(err) => println!("  Stopped early: {err}"),
    }

    if let Some(err) = &report.load_error {
        println!("  ⚠ Existing data could not be read: {err}");
    }

    if let Some(path) = &report.snapshot_path {
        println!("  Snapshot: {}", path.display());
    }

    match &report.outcome {
        RunOutcome::NoNewRecords {
            accumulation_exists: true,
        } => println!("  Accumulation unchanged"),
        RunOutcome::NoNewRecords {
            accumulation_exists: false,
        } => println!("  No accumulation to preserve"),
        RunOutcome::Merged(summary) => println!(
            "  Accumulation: {} total ({} added, {} updated)",
            summary.total, summary.added, summary.replaced
        ),
        RunOutcome::MergeFailed(err) => {
            println!("  ⚠ Merge failed, accumulation left unchanged: {err}");
        }
    }
}
