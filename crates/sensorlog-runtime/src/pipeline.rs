//! Batch driver tying the normalizer, store and aggregator together.
//!
//! [`Pipeline::ingest_all`] walks the input directory and pushes every CSV
//! file through normalize → append, one transaction per file. A file that
//! cannot be read, or whose batch the store rejects, is recorded in the
//! [`RunSummary`] and the run moves on to the next file.
//! [`Pipeline::build_report`] and [`Pipeline::write_report`] then summarize the
//! whole table into the dated report file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use sensorlog_core::clock::Clock;
use sensorlog_core::models::ErrorEntry;
use sensorlog_data::aggregator::{report_file_name, Aggregator, Report, ReportOutcome};
use sensorlog_data::normalizer::{process_file, NormalizedBatch};
use sensorlog_data::store::{Store, StoreError};
use tracing::{debug, info, warn};

// ── Configuration ─────────────────────────────────────────────────────────────

/// Directories the pipeline reads from and writes to.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Scanned (non-recursively) for `*.csv` files.
    pub input_dir: PathBuf,
    /// Receives `reportYYYYMMDD.txt`.
    pub report_dir: PathBuf,
}

// ── Outcomes ──────────────────────────────────────────────────────────────────

/// What happened to the records of one file.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveStatus {
    /// This many records were committed.
    Saved(usize),
    /// The file produced no records; the store was not touched.
    NothingToSave,
    /// The store rejected the batch; nothing from this file was committed.
    StoreFailed(String),
}

/// Result of pushing one file through the pipeline.
#[derive(Debug, Clone)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub batch: NormalizedBatch,
    pub status: SaveStatus,
}

impl FileOutcome {
    pub fn errors(&self) -> &[ErrorEntry] {
        &self.batch.errors
    }

    pub fn saved(&self) -> usize {
        match self.status {
            SaveStatus::Saved(n) => n,
            _ => 0,
        }
    }
}

/// Per-file outcomes of one [`Pipeline::ingest_all`] run.
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub files: Vec<FileOutcome>,
}

impl RunSummary {
    pub fn total_saved(&self) -> usize {
        self.files.iter().map(FileOutcome::saved).sum()
    }

    pub fn total_errors(&self) -> usize {
        self.files.iter().map(|f| f.batch.errors.len()).sum()
    }

    pub fn total_excluded(&self) -> usize {
        self.files.iter().map(|f| f.batch.excluded).sum()
    }

    /// Files whose batch the store rejected.
    pub fn store_failures(&self) -> impl Iterator<Item = &FileOutcome> {
        self.files
            .iter()
            .filter(|f| matches!(f.status, SaveStatus::StoreFailed(_)))
    }
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

/// Synchronous ingest-and-report driver.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use sensorlog_core::clock::{Clock, SystemClock};
/// use sensorlog_data::store::{Store, StoreConfig};
/// use sensorlog_runtime::pipeline::{Pipeline, PipelineConfig};
///
/// let clock: Arc<dyn Clock> = Arc::new(SystemClock);
/// let store = Store::new(StoreConfig::new("research_data.db"), clock.clone());
/// let config = PipelineConfig { input_dir: "input".into(), report_dir: ".".into() };
/// let pipeline = Pipeline::new(config, store, clock);
/// pipeline.init().unwrap();
/// let summary = pipeline.ingest_all();
/// println!("saved {} records", summary.total_saved());
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    store: Store,
    clock: Arc<dyn Clock>,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, store: Store, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            store,
            clock,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Prepare the database schema. Call once before anything else.
    pub fn init(&self) -> anyhow::Result<()> {
        self.store
            .init()
            .with_context(|| format!("initializing store at {}", self.store.path().display()))
    }

    /// Normalize and persist every CSV file of the input directory, in path order.
    pub fn ingest_all(&self) -> RunSummary {
        let files = find_csv_files(&self.config.input_dir);
        if files.is_empty() {
            warn!("No input files found in {}", self.config.input_dir.display());
        }

        let summary = RunSummary {
            files: files.iter().map(|path| self.ingest_file(path)).collect(),
        };

        info!(
            "Ingest complete: {} files, {} records saved, {} errors, {} excluded",
            summary.files.len(),
            summary.total_saved(),
            summary.total_errors(),
            summary.total_excluded()
        );
        summary
    }

    /// Normalize one file and append its records as a single batch.
    pub fn ingest_file(&self, path: &Path) -> FileOutcome {
        info!("Processing {}", path.display());
        let batch = process_file(path);

        for entry in batch.errors.iter().filter(|e| !e.is_file_level()) {
            debug!("{}: {}", batch.source_file, entry);
        }

        let status = match self.store.append(&batch.records) {
            Ok(0) => SaveStatus::NothingToSave,
            Ok(n) => SaveStatus::Saved(n),
            Err(e) => {
                warn!("{}: batch not saved: {}", batch.source_file, e);
                SaveStatus::StoreFailed(e.to_string())
            }
        };

        FileOutcome {
            path: path.to_path_buf(),
            batch,
            status,
        }
    }

    /// Aggregate the full table, stamped with the current clock reading.
    pub fn build_report(&self) -> Result<ReportOutcome, StoreError> {
        let records = self.store.read_all()?;
        let outcome = Aggregator::report(&records, self.clock.now());
        if outcome == ReportOutcome::NoData {
            info!("No stored records; skipping report");
        }
        Ok(outcome)
    }

    /// Write `report` to `reportYYYYMMDD.txt` in the report directory, dated
    /// from the report's own `generated_at`.
    pub fn write_report(&self, report: &Report) -> sensorlog_core::Result<PathBuf> {
        std::fs::create_dir_all(&self.config.report_dir)?;
        let path = self
            .config
            .report_dir
            .join(report_file_name(report.generated_at.date()));
        std::fs::write(&path, report.to_string())?;
        info!(
            "Report written to {} (mean {:.2} lb, {})",
            path.display(),
            report.mean,
            report.status
        );
        Ok(path)
    }
}

/// All `*.csv` files directly inside `dir`, sorted by path.
pub fn find_csv_files(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        warn!("Input directory does not exist: {}", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && entry
                    .path()
                    .extension()
                    .map(|ext| ext == "csv")
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

// ── Tests ─────────────────────────────────────────────────────────────────────
