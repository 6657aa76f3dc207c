//! SQLite persistence for canonical records.
//!
//! A connection is opened for each operation and dropped before it returns.
//! Every [`Store::append`] call is one transaction with one shared
//! `processed_at` value; a failure anywhere in the batch rolls all of it back.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use sensorlog_core::clock::Clock;
use sensorlog_core::models::{CanonicalRecord, PersistedRecord};
use thiserror::Error;
use tracing::{debug, info};

/// Format of the `processed_at` column. Fixed width, so text order is time order.
pub const PROCESSED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS sensor_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT,
    sensor_id TEXT,
    value_lb REAL,
    original_value TEXT,
    source_file TEXT,
    processed_at TEXT
);
CREATE INDEX IF NOT EXISTS idx_sensor_logs_timestamp ON sensor_logs (timestamp);
";

const INSERT_SQL: &str = "INSERT INTO sensor_logs \
     (timestamp, sensor_id, value_lb, original_value, source_file, processed_at) \
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)";

const SELECT_COLUMNS: &str =
    "SELECT id, timestamp, sensor_id, value_lb, original_value, source_file, processed_at \
     FROM sensor_logs";

// ── Errors ────────────────────────────────────────────────────────────────────

/// Failures surfaced by [`Store`] operations.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Failed to open database {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Failed to initialize schema: {0}")]
    Schema(#[source] rusqlite::Error),

    #[error("Transaction failed: {0}")]
    Transaction(#[source] rusqlite::Error),

    /// Insert of the record at `position` (0-based within the batch) failed.
    #[error("Failed to insert record {position} of batch: {source}")]
    Insert {
        position: usize,
        #[source]
        source: rusqlite::Error,
    },

    #[error("Query failed: {0}")]
    Query(#[source] rusqlite::Error),

    /// Record at `position` carries a value SQLite cannot round-trip.
    #[error("Record {position} of batch has non-finite value {value}")]
    NonFiniteValue { position: usize, value: f64 },
}

// ── Configuration ─────────────────────────────────────────────────────────────

/// Where and how to open the database.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub path: PathBuf,
    /// How long to wait on a lock held by another connection.
    pub busy_timeout: Duration,
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn with_busy_timeout(mut self, busy_timeout: Duration) -> Self {
        self.busy_timeout = busy_timeout;
        self
    }
}

// ── Store ─────────────────────────────────────────────────────────────────────

/// Handle to the `sensor_logs` table.
pub struct Store {
    config: StoreConfig,
    clock: Arc<dyn Clock>,
}

impl Store {
    pub fn new(config: StoreConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Create the table and index if missing. Safe to call on every start.
    pub fn init(&self) -> Result<(), StoreError> {
        let conn = self.connect()?;
        conn.execute_batch(SCHEMA).map_err(StoreError::Schema)?;
        debug!("Schema ready in {}", self.config.path.display());
        Ok(())
    }

    /// Persist `records` as one batch and return how many rows were written.
    ///
    /// An empty slice is a no-op and does not touch the database.
    pub fn append(&self, records: &[CanonicalRecord]) -> Result<usize, StoreError> {
        if records.is_empty() {
            return Ok(0);
        }
        // SQLite stores NaN as NULL, which would poison every later read.
        if let Some((position, record)) = records
            .iter()
            .enumerate()
            .find(|(_, r)| !r.value_lb().is_finite())
        {
            return Err(StoreError::NonFiniteValue {
                position,
                value: record.value_lb(),
            });
        }

        let mut conn = self.connect()?;
        let tx = conn.transaction().map_err(StoreError::Transaction)?;

        let processed_at = self.next_processed_at(&tx)?;

        {
            let mut stmt = tx.prepare_cached(INSERT_SQL).map_err(StoreError::Transaction)?;
            for (position, record) in records.iter().enumerate() {
                stmt.execute(params![
                    record.timestamp(),
                    record.sensor_id(),
                    record.value_lb(),
                    record.original_value(),
                    record.source_file(),
                    processed_at,
                ])
                .map_err(|source| StoreError::Insert { position, source })?;
            }
        }

        tx.commit().map_err(StoreError::Transaction)?;

        info!(
            "Saved {} records to {} (processed_at {})",
            records.len(),
            self.config.path.display(),
            processed_at
        );
        Ok(records.len())
    }

    /// Up to `limit` records, newest `timestamp` first, ties by newest id.
    pub fn read_recent(&self, limit: usize) -> Result<Vec<PersistedRecord>, StoreError> {
        let conn = self.connect()?;
        let sql = format!("{SELECT_COLUMNS} ORDER BY timestamp DESC, id DESC LIMIT ?1");
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        query_records(&conn, &sql, params![limit])
    }

    /// Every persisted record, in insertion order.
    pub fn read_all(&self) -> Result<Vec<PersistedRecord>, StoreError> {
        let conn = self.connect()?;
        let sql = format!("{SELECT_COLUMNS} ORDER BY id");
        query_records(&conn, &sql, params![])
    }

    /// Number of persisted records.
    pub fn count(&self) -> Result<usize, StoreError> {
        let conn = self.connect()?;
        let n: i64 = conn
            .query_row("SELECT COUNT(*) FROM sensor_logs", [], |row| row.get(0))
            .map_err(StoreError::Query)?;
        Ok(usize::try_from(n).unwrap_or(0))
    }

    // ── Private ───────────────────────────────────────────────────────────────

    fn connect(&self) -> Result<Connection, StoreError> {
        let open_err = |source| StoreError::Open {
            path: self.config.path.clone(),
            source,
        };
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&self.config.path, flags).map_err(open_err)?;
        conn.busy_timeout(self.config.busy_timeout).map_err(open_err)?;
        Ok(conn)
    }

    /// Batch timestamp from the clock, moved one microsecond past the latest
    /// stored batch when the clock has not advanced beyond it.
    fn next_processed_at(&self, conn: &Connection) -> Result<String, StoreError> {
        let now = self.clock.now();

        let latest: Option<String> = conn
            .query_row("SELECT MAX(processed_at) FROM sensor_logs", [], |row| row.get(0))
            .optional()
            .map_err(StoreError::Query)?
            .flatten();

        let latest = latest
            .as_deref()
            .and_then(|s| NaiveDateTime::parse_from_str(s, PROCESSED_AT_FORMAT).ok());

        let stamp = match latest {
            Some(prev) if prev >= now => prev + chrono::Duration::microseconds(1),
            _ => now,
        };
        Ok(stamp.format(PROCESSED_AT_FORMAT).to_string())
    }
}

fn query_records(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<PersistedRecord>, StoreError> {
    let mut stmt = conn.prepare(sql).map_err(StoreError::Query)?;
    let rows = stmt.query_map(params, map_row).map_err(StoreError::Query)?;
    rows.collect::<Result<Vec<_>, _>>().map_err(StoreError::Query)
}

fn map_row(row: &Row<'_>) -> rusqlite::Result<PersistedRecord> {
    let timestamp: Option<String> = row.get(1)?;
    let sensor_id: Option<String> = row.get(2)?;
    let original_value: Option<String> = row.get(4)?;
    let source_file: Option<String> = row.get(5)?;
    Ok(PersistedRecord {
        id: row.get(0)?,
        processed_at: row.get::<_, Option<String>>(6)?.unwrap_or_default(),
        record: CanonicalRecord::new(
            source_file.unwrap_or_default(),
            timestamp.as_deref(),
            sensor_id.as_deref(),
            row.get(3)?,
            original_value.unwrap_or_default(),
        ),
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
