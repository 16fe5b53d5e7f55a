//! # Pricelog Store
//!
//! Append-only history log for supplier price/stock observations.
//!
//! ## Overview
//!
//! The log is a single UTF-8 CSV file: one header row, then one row per
//! observation. Every row in a file shares the header's column layout. When
//! the layout the code writes differs from the header on disk, the old file
//! is renamed aside (archived) and a fresh file is started.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pricelog_store::{CanonicalRecord, HistoryStore, StoreConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = HistoryStore::open(StoreConfig::default())?;
//!     let report = store.append(&[CanonicalRecord::new("A1", 10.5, 3).with_category("X")])?;
//!     println!("wrote {} rows to {}", report.rows_written, report.log_path.display());
//!     Ok(())
//! }
//! ```
//!
//! ## Layouts
//!
//! | Version | Columns |
//! |---------|---------|
//! | `v1` | `datetime,code,price,stock` |
//! | `v2` | `+category` |
//! | `v3` | `+supplier` |
//! | `v4` | `+is_discounted` (current) |
//!
//! ## Concurrency
//!
//! Single writer. Two processes appending to the same log concurrently can
//! interleave archive and write steps; callers serialize runs.

pub mod archive;
pub mod compare;
pub mod history;
pub mod normalize;
pub mod record;
pub mod schema;

use std::env;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use time::Date;
use tracing::{info, warn};

pub use compare::{
    compare, CategoryCount, Comparison, PeriodSummary, ProductChange, SkipReason, Snapshot,
};
pub use history::{History, HistoryReader, Observation};
pub use normalize::{RecordNormalizer, RunTimestamp};
pub use record::{CanonicalRecord, Discount, UNKNOWN_CATEGORY};
pub use schema::{inspect_header, HeaderCheck, LogSchema, SchemaVersion};

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O error (file system operations).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// CSV encoding or decoding error.
    #[error(transparent)]
    Csv(#[from] csv::Error),

    /// A log file whose header cannot be interpreted.
    #[error("malformed history log {}: {reason}", path.display())]
    MalformedHistory { path: PathBuf, reason: String },

    /// Comparison range with start after end.
    #[error("start date {start} is after end date {end}")]
    InvalidRange { start: Date, end: Date },
}

/// Location of the history log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    /// Root directory for pricelog data.
    pub pricelog_home: PathBuf,
    /// Path to the live CSV log.
    pub log_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::in_home(resolve_pricelog_home())
    }
}

impl StoreConfig {
    pub fn in_home(pricelog_home: PathBuf) -> Self {
        let log_path = pricelog_home.join("data").join("history.csv");
        Self {
            pricelog_home,
            log_path,
        }
    }

    pub fn with_log_path(mut self, log_path: impl Into<PathBuf>) -> Self {
        self.log_path = log_path.into();
        self
    }
}

/// What a single `append` did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppendReport {
    pub log_path: PathBuf,
    pub timestamp: RunTimestamp,
    pub schema_version: SchemaVersion,
    pub rows_written: usize,
    pub header_written: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived_to: Option<PathBuf>,
}

/// Append-only writer for the history log.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    config: StoreConfig,
    schema: LogSchema,
}

impl HistoryStore {
    /// Open the store writing the current layout.
    pub fn open(config: StoreConfig) -> Result<Self, StoreError> {
        Self::open_with_schema(config, LogSchema::current())
    }

    /// Open the store pinned to a specific layout.
    pub fn open_with_schema(config: StoreConfig, schema: LogSchema) -> Result<Self, StoreError> {
        if let Some(parent) = config.log_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self { config, schema })
    }

    pub fn log_path(&self) -> &Path {
        &self.config.log_path
    }

    pub const fn schema(&self) -> LogSchema {
        self.schema
    }

    /// Compare the on-disk header with this store's layout without touching the file.
    pub fn check_header(&self) -> Result<HeaderCheck, StoreError> {
        Ok(inspect_header(&self.config.log_path, self.schema)?)
    }

    /// Append `records` stamped with the current time.
    pub fn append(&self, records: &[CanonicalRecord]) -> Result<AppendReport, StoreError> {
        self.append_at(records, RunTimestamp::now())
    }

    /// Append `records`, all stamped with `timestamp`.
    ///
    /// An empty batch writes nothing: no header, no archive.
    pub fn append_at(
        &self,
        records: &[CanonicalRecord],
        timestamp: RunTimestamp,
    ) -> Result<AppendReport, StoreError> {
        let log_path = self.config.log_path.clone();
        if records.is_empty() {
            return Ok(AppendReport {
                log_path,
                timestamp,
                schema_version: self.schema.version(),
                rows_written: 0,
                header_written: false,
                archived_to: None,
            });
        }

        let mut archived_to = None;
        let header_needed = match self.check_header()? {
            HeaderCheck::Compatible => false,
            HeaderCheck::Missing => true,
            HeaderCheck::Incompatible { found, identified } => {
                let target = archive::archive(&log_path, timestamp)?;
                warn!(
                    log = %log_path.display(),
                    archived_to = %target.display(),
                    found = found.as_deref().unwrap_or("<unreadable>"),
                    identified = identified.map(SchemaVersion::as_str).unwrap_or("unknown"),
                    expected = %self.schema.version(),
                    "history header does not match current layout; archived old log"
                );
                archived_to = Some(target);
                true
            }
        };

        let normalizer = RecordNormalizer::new(self.schema, timestamp);
        let payload = encode_rows(self.schema, header_needed, &normalizer.rows(records))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;
        file.write_all(&payload)?;
        file.flush()?;
        file.sync_data()?;

        info!(
            log = %log_path.display(),
            rows = records.len(),
            header_written = header_needed,
            timestamp = %timestamp,
            "appended history rows"
        );

        Ok(AppendReport {
            log_path,
            timestamp,
            schema_version: self.schema.version(),
            rows_written: records.len(),
            header_written: header_needed,
            archived_to,
        })
    }
}

/// Encode the optional header and all rows into one buffer so the file sees a
/// single write after the header decision is final.
fn encode_rows(
    schema: LogSchema,
    with_header: bool,
    rows: &[Vec<String>],
) -> Result<Vec<u8>, StoreError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    if with_header {
        writer.write_record(schema.columns())?;
    }
    for row in rows {
        writer.write_record(row)?;
    }
    writer
        .into_inner()
        .map_err(|error| StoreError::Io(error.into_error()))
}

/// Resolve the pricelog home directory from environment or default.
fn resolve_pricelog_home() -> PathBuf {
    if let Some(path) = env::var_os("PRICELOG_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".pricelog");
    }

    PathBuf::from(".pricelog")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use time::macros::datetime;

    fn store_in(dir: &Path) -> HistoryStore {
        HistoryStore::open(StoreConfig::in_home(dir.to_path_buf())).expect("store open")
    }

    fn stamp() -> RunTimestamp {
        RunTimestamp::from_offset_datetime(datetime!(2026-03-01 12:00:00 UTC))
    }

    #[test]
    fn first_append_writes_header_then_rows() {
        let temp = tempdir().expect("tempdir");
        let store = store_in(temp.path());

        let report = store
            .append_at(&[CanonicalRecord::new("A1", 10.5, 3).with_category("X")], stamp())
            .expect("append");

        assert!(report.header_written);
        assert_eq!(report.archived_to, None);
        let content = fs::read_to_string(store.log_path()).expect("read");
        assert_eq!(
            content,
            "datetime,code,price,stock,category,supplier,is_discounted\n\
             2026-03-01 12:00:00,A1,10.5,3,X,,\n"
        );
    }

    #[test]
    fn empty_batch_leaves_no_file_behind() {
        let temp = tempdir().expect("tempdir");
        let store = store_in(temp.path());

        let report = store.append_at(&[], stamp()).expect("append");

        assert_eq!(report.rows_written, 0);
        assert!(!store.log_path().exists());
    }

    #[test]
    fn fields_with_commas_are_quoted() {
        let temp = tempdir().expect("tempdir");
        let store = store_in(temp.path());

        store
            .append_at(&[CanonicalRecord::new("A,1", 1.0, 1).with_category("Fans, ceiling")], stamp())
            .expect("append");

        let history = HistoryReader::load(store.log_path()).expect("load");
        assert_eq!(history.observations[0].code, "A,1");
        assert_eq!(history.observations[0].category, "Fans, ceiling");
    }

    #[test]
    fn default_config_places_log_under_data_dir() {
        let config = StoreConfig::in_home(PathBuf::from("/srv/pricelog"));
        assert_eq!(config.log_path, Path::new("/srv/pricelog/data/history.csv"));
    }
}
