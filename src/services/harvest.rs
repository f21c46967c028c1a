//! One harvest run: load known ids, fetch, snapshot, merge.
//!
//! Every failure degrades to doing less work this run. Re-running is the
//! recovery path, and is safe because merging is keyed by id.

use crate::clients::CatalogSource;
use crate::services::fetcher::{Fetcher, StopReason};
use crate::services::reconcile::KnownIds;
use crate::services::store::{DatasetStore, MergeSummary};
use chrono::NaiveDate;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarvestPhase {
    Init,
    LoadKnownIds,
    Fetch,
    Snapshot,
    Merge,
    Persist,
    Done,
}

impl fmt::Display for HarvestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::LoadKnownIds => "load_known_ids",
            Self::Fetch => "fetch",
            Self::Snapshot => "snapshot",
            Self::Merge => "merge",
            Self::Persist => "persist",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    NoNewRecords { accumulation_exists: bool },
    Merged(MergeSummary),
    /// The accumulation is left as it was before the run.
    MergeFailed(String),
}

#[derive(Debug, Clone)]
pub struct HarvestReport {
    pub known: usize,
    /// `Some` when the accumulation existed but could not be read.
    pub load_error: Option<String>,
    pub fetched: usize,
    pub stop_reason: StopReason,
    pub snapshot_path: Option<PathBuf>,
    pub outcome: RunOutcome,
}

pub struct Harvester<S> {
    fetcher: Fetcher<S>,
    store: DatasetStore,
}

impl<S: CatalogSource> Harvester<S> {
    pub fn new(fetcher: Fetcher<S>, store: DatasetStore) -> Self {
        Self { fetcher, store }
    }

    pub fn store(&self) -> &DatasetStore {
        &self.store
    }

    pub async fn run(&self, date: NaiveDate) -> HarvestReport {
        let mut phase = HarvestPhase::Init;
        advance(&mut phase, HarvestPhase::LoadKnownIds);

        let accumulation_path = self.store.accumulation_path();
        let (known, load_error) = match self.store.load_known_ids() {
            Ok(known) if known.is_empty() && !self.store.accumulation_exists() => {
                info!(
                    "'{}' not found. Starting fresh scrape for this file",
                    accumulation_path.display()
                );
                (known, None)
            }
            Ok(known) => {
                info!("Loaded {} existing manhwa IDs", known.len());
                (known, None)
            }
            Err(err) => {
                warn!(
                    error = %err,
                    "Error loading existing data from '{}', proceeding with fresh scrape",
                    accumulation_path.display()
                );
                (KnownIds::new(), Some(err.to_string()))
            }
        };

        advance(&mut phase, HarvestPhase::Fetch);
        let outcome = self.fetcher.fetch(&known).await;
        let fetched = outcome.records.len();

        if outcome.records.is_empty() {
            let accumulation_exists = self.store.accumulation_exists();
            if accumulation_exists {
                info!(
                    "No new manhwa to merge. '{}' remains unchanged",
                    accumulation_path.display()
                );
            } else {
                info!("No new manhwa fetched and no existing accumulation to preserve");
            }
            advance(&mut phase, HarvestPhase::Done);
            return HarvestReport {
                known: known.len(),
                load_error,
                fetched,
                stop_reason: outcome.stop_reason,
                snapshot_path: None,
                outcome: RunOutcome::NoNewRecords {
                    accumulation_exists,
                },
            };
        }

        advance(&mut phase, HarvestPhase::Snapshot);
        let snapshot_path = match self.store.write_snapshot(&outcome.records, date) {
            Ok(path) => Some(path),
            Err(err) => {
                error!(error = %err, "Error saving snapshot, continuing with merge");
                None
            }
        };

        advance(&mut phase, HarvestPhase::Merge);
        let run_outcome = match self.store.merge(&outcome.records) {
            Ok(merged) => {
                advance(&mut phase, HarvestPhase::Persist);
                match self.store.persist(&merged) {
                    Ok(_) => RunOutcome::Merged(merged.summary),
                    Err(err) => {
                        error!(error = %err, "Error saving merged data");
                        RunOutcome::MergeFailed(err.to_string())
                    }
                }
            }
            Err(err) => {
                error!(error = %err, "Error merging with existing data");
                RunOutcome::MergeFailed(err.to_string())
            }
        };

        advance(&mut phase, HarvestPhase::Done);
        HarvestReport {
            known: known.len(),
            load_error,
            fetched,
            stop_reason: outcome.stop_reason,
            snapshot_path,
            outcome: run_outcome,
        }
    }
}

fn advance(phase: &mut HarvestPhase, next: HarvestPhase) {
    debug!(from = %phase, to = %next, "Harvest phase");
    *phase = next;
}
