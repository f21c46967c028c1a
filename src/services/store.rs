//! CSV-backed dataset: dated snapshots plus one deduplicated accumulation.

use crate::config::OutputConfig;
use crate::models::record::{COLUMNS, Record};
use crate::services::reconcile::{KnownIds, dedup_keep_last};
use chrono::NaiveDate;
use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("File system error: {0}")]
    Io(#[from] io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeSummary {
    /// Rows in the accumulation before the merge.
    pub previous: usize,
    /// Ids not previously present.
    pub added: usize,
    /// Ids that replaced an existing row.
    pub replaced: usize,
    pub total: usize,
}

#[derive(Debug, Clone)]
pub struct MergedDataset {
    pub rows: Vec<Record>,
    pub summary: MergeSummary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccumulationSummary {
    pub path: PathBuf,
    pub rows: usize,
    pub newest_start_year: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct DatasetStore {
    directory: PathBuf,
    prefix: String,
    extension: String,
}

impl DatasetStore {
    pub fn new(directory: impl Into<PathBuf>, prefix: &str, extension: &str) -> Self {
        Self {
            directory: directory.into(),
            prefix: prefix.to_string(),
            extension: extension.to_string(),
        }
    }

    #[must_use]
    pub fn from_config(config: &OutputConfig) -> Self {
        Self::new(&config.directory, &config.prefix, &config.extension)
    }

    #[must_use]
    pub fn snapshot_path(&self, date: NaiveDate) -> PathBuf {
        self.directory.join(format!(
            "{}_{}.{}",
            self.prefix,
            date.format("%Y%m%d"),
            self.extension
        ))
    }

    #[must_use]
    pub fn accumulation_path(&self) -> PathBuf {
        self.directory
            .join(format!("{}_updated.{}", self.prefix, self.extension))
    }

    #[must_use]
    pub fn accumulation_exists(&self) -> bool {
        self.accumulation_path().is_file()
    }

    /// Reads every row of the accumulation. A missing file is an empty one.
    pub fn load_accumulation(&self) -> Result<Vec<Record>, StoreError> {
        let path = self.accumulation_path();
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_records(&path)
    }

    pub fn load_known_ids(&self) -> Result<KnownIds, StoreError> {
        let records = self.load_accumulation()?;
        Ok(KnownIds::from_records(&records))
    }

    /// Writes this run's records to the dated snapshot, replacing any
    /// snapshot from earlier the same day.
    pub fn write_snapshot(
        &self,
        records: &[Record],
        date: NaiveDate,
    ) -> Result<PathBuf, StoreError> {
        let path = self.snapshot_path(date);
        write_records(&path, records)?;
        info!("Saved {} cleaned entries to {}", records.len(), path.display());
        Ok(path)
    }

    /// Combines the accumulation with `records`, keeping the newest row per
    /// id. Nothing is written.
    pub fn merge(&self, records: &[Record]) -> Result<MergedDataset, StoreError> {
        let prior = self.load_accumulation()?;
        let known = KnownIds::from_records(&prior);
        let previous = prior.len();

        let mut fresh = KnownIds::new();
        let (mut added, mut replaced) = (0, 0);
        for record in records {
            if !fresh.insert(record.id) {
                continue;
            }
            if known.contains(record.id) {
                replaced += 1;
            } else {
                added += 1;
            }
        }

        let mut combined = prior;
        combined.extend_from_slice(records);
        let rows = dedup_keep_last(combined);

        let summary = MergeSummary {
            previous,
            added,
            replaced,
            total: rows.len(),
        };
        Ok(MergedDataset { rows, summary })
    }

    /// Replaces the accumulation file with `merged`.
    pub fn persist(&self, merged: &MergedDataset) -> Result<PathBuf, StoreError> {
        let path = self.accumulation_path();
        write_records(&path, &merged.rows)?;
        info!(
            "Merged data saved to '{}'. Total entries: {}",
            path.display(),
            merged.rows.len()
        );
        Ok(path)
    }

    /// If the existing accumulation cannot be read it is left untouched and
    /// the error is returned.
    pub fn merge_and_persist(&self, records: &[Record]) -> Result<MergeSummary, StoreError> {
        let merged = self.merge(records)?;
        self.persist(&merged)?;
        Ok(merged.summary)
    }

    /// `None` when no accumulation exists yet.
    pub fn summary(&self) -> Result<Option<AccumulationSummary>, StoreError> {
        if !self.accumulation_exists() {
            return Ok(None);
        }
        let records = self.load_accumulation()?;
        Ok(Some(AccumulationSummary {
            path: self.accumulation_path(),
            rows: records.len(),
            newest_start_year: records.iter().filter_map(|r| r.start_year).max(),
        }))
    }
}

fn read_records(path: &Path) -> Result<Vec<Record>, StoreError> {
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let records = reader
        .deserialize::<Record>()
        .collect::<Result<Vec<_>, _>>()?;
    debug!(path = %path.display(), rows = records.len(), "Loaded dataset");
    Ok(records)
}

fn quoted(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

/// `id` and `start_year` are written bare; text columns are always quoted,
/// even when they look numeric.
fn encode_row(record: &Record) -> [String; 11] {
    let text = |value: Option<&str>| quoted(value.unwrap_or_default());
    [
        record.id.to_string(),
        text(record.title_romaji.as_deref()),
        text(record.title_english.as_deref()),
        text(record.title_native.as_deref()),
        quoted(&record.title_synonyms),
        record.start_year.map(|y| y.to_string()).unwrap_or_default(),
        quoted(&record.genres),
        quoted(&record.tags),
        text(record.description.as_deref()),
        text(record.cover_image_url.as_deref()),
        quoted(&record.site_url),
    ]
}

/// Writes through a sibling temp file and renames it into place, so a failed
/// write never clobbers the previous contents.
fn write_records(path: &Path, records: &[Record]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let result = (|| -> Result<(), StoreError> {
        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .quote_style(QuoteStyle::Never)
            .from_path(&tmp_path)?;
        writer.write_record(COLUMNS.map(quoted))?;
        for record in records {
            writer.write_record(&encode_row(record))?;
        }
        writer.flush()?;
        Ok(())
    })();

    match result {
        Ok(()) => {
            fs::rename(&tmp_path, path)?;
            Ok(())
        }
        Err(err) => {
            let _ = fs::remove_file(&tmp_path);
            Err(err)
        }
    }
}
