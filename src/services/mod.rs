pub mod fetcher;
pub use fetcher::{FetchOptions, FetchOutcome, Fetcher, StopReason};

pub mod harvest;
pub use harvest::{HarvestPhase, HarvestReport, Harvester, RunOutcome};

pub mod normalize;
pub use normalize::{normalize, normalize_text};

pub mod reconcile;
pub use reconcile::{KnownIds, Keyed, dedup_keep_last};

pub mod store;
pub use store::{DatasetStore, MergeSummary, StoreError};
