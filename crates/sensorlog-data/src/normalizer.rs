//! CSV loading and unit normalization.
//!
//! Turns one sensor CSV file into [`CanonicalRecord`]s plus an error log.
//! Row-level problems are collected as [`ErrorEntry::Row`] and never stop the
//! file; a file that cannot be read at all yields exactly one
//! [`ErrorEntry::File`] and no records.

use std::collections::HashMap;
use std::path::Path;

use csv::StringRecord;
use sensorlog_core::formatting::round_decimals;
use sensorlog_core::models::{CanonicalRecord, ErrorEntry, RowFailure};
use sensorlog_core::SensorlogError;
use tracing::{debug, warn};

/// Pounds per kilogram.
pub const KG_TO_LB: f64 = 2.20462;

/// Unit marker identifying a kilogram reading, e.g. `"10.5kg"`.
pub const KG_MARKER: &str = "kg";

/// `status` cell value that excludes a row from both records and errors.
pub const EXCLUDED_STATUS: &str = "Error";

const COL_TIMESTAMP: &str = "timestamp";
const COL_SENSOR_ID: &str = "sensor_id";
const COL_VALUE: &str = "value";
const COL_STATUS: &str = "status";

// ── NormalizedBatch ───────────────────────────────────────────────────────────

/// Everything produced from one source file.
#[derive(Debug, Clone, Default)]
pub struct NormalizedBatch {
    /// File name (no directories) stamped on every record.
    pub source_file: String,
    /// Accepted rows, in source order.
    pub records: Vec<CanonicalRecord>,
    /// Rejected rows (or the single file-level failure), in source order.
    pub errors: Vec<ErrorEntry>,
    /// Rows dropped because their status is [`EXCLUDED_STATUS`].
    pub excluded: usize,
    /// Data rows seen, header excluded.
    pub total_rows: usize,
}

impl NormalizedBatch {
    fn new(source_file: impl Into<String>) -> Self {
        Self {
            source_file: source_file.into(),
            ..Default::default()
        }
    }

    /// `true` when the file itself could not be read.
    pub fn is_file_failure(&self) -> bool {
        self.errors.iter().any(ErrorEntry::is_file_level)
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Read and normalize the CSV file at `path`.
///
/// Never returns an error: whole-file problems (missing file, invalid UTF-8,
/// missing header or `value` column) are reported as a single file-level
/// entry in [`NormalizedBatch::errors`].
pub fn process_file(path: &Path) -> NormalizedBatch {
    let source_file = file_name(path);

    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) => {
            return file_failure(
                source_file,
                SensorlogError::FileRead {
                    path: path.to_path_buf(),
                    source: e,
                },
            )
        }
    };

    if std::str::from_utf8(&bytes).is_err() {
        return file_failure(source_file, SensorlogError::InvalidEncoding(path.to_path_buf()));
    }

    normalize(path, source_file, bytes.as_slice())
}

/// Normalize CSV text from any reader, stamping records with `source_file`.
///
/// Used for in-memory input; the reader is expected to yield UTF-8.
pub fn process_reader<R: std::io::Read>(source_file: &str, reader: R) -> NormalizedBatch {
    normalize(Path::new(source_file), source_file.to_string(), reader)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn normalize<R: std::io::Read>(path: &Path, source_file: String, input: R) -> NormalizedBatch {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(input);

    let headers = match reader.headers() {
        Ok(h) => h.clone(),
        Err(e) => {
            return file_failure(
                source_file,
                SensorlogError::MalformedCsv {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                },
            )
        }
    };

    let columns = match Columns::resolve(&headers) {
        Some(c) => c,
        None if headers.iter().all(|h| h.trim().is_empty()) => {
            return file_failure(source_file, SensorlogError::MissingHeader(path.to_path_buf()))
        }
        None => {
            return file_failure(
                source_file,
                SensorlogError::MissingColumn {
                    path: path.to_path_buf(),
                    column: COL_VALUE.to_string(),
                },
            )
        }
    };

    let mut batch = NormalizedBatch::new(source_file);

    for (idx, result) in reader.records().enumerate() {
        // Line 1 is the header, data rows are 1-based after it.
        let row_index = idx + 2;
        batch.total_rows += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                batch.errors.push(ErrorEntry::Row {
                    row_index,
                    raw_value: String::new(),
                    failure: RowFailure::Unreadable {
                        message: e.to_string(),
                    },
                });
                continue;
            }
        };

        let row = columns.view(&record);

        if row.status == Some(EXCLUDED_STATUS) {
            batch.excluded += 1;
            continue;
        }

        match parse_pounds(row.value) {
            Ok(value_lb) => batch.records.push(CanonicalRecord::new(
                batch.source_file.as_str(),
                row.timestamp,
                row.sensor_id,
                value_lb,
                row.value,
            )),
            Err(failure) => batch.errors.push(ErrorEntry::Row {
                row_index,
                raw_value: row.value.to_string(),
                failure,
            }),
        }
    }

    debug!(
        "File {}: {} rows, {} excluded, {} mapped, {} rejected",
        batch.source_file,
        batch.total_rows,
        batch.excluded,
        batch.records.len(),
        batch.errors.len(),
    );

    batch
}

/// Convert a raw `value` cell to pounds.
///
/// Cells containing [`KG_MARKER`] are converted with [`KG_TO_LB`] and rounded
/// to two decimals; anything else must already be a plain number of pounds.
pub fn parse_pounds(raw: &str) -> Result<f64, RowFailure> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(RowFailure::MissingValue);
    }

    if trimmed.contains(KG_MARKER) {
        let number = trimmed.replace(KG_MARKER, "");
        let kg = parse_finite(number.trim())?;
        Ok(round_decimals(kg * KG_TO_LB, 2))
    } else {
        parse_finite(trimmed)
    }
}

fn parse_finite(text: &str) -> Result<f64, RowFailure> {
    let value: f64 = text.parse().map_err(|_| RowFailure::InvalidNumber {
        text: text.to_string(),
    })?;
    if !value.is_finite() {
        return Err(RowFailure::NonFiniteNumber {
            text: text.to_string(),
        });
    }
    Ok(value)
}

fn file_failure(source_file: String, cause: SensorlogError) -> NormalizedBatch {
    warn!("{}", cause);
    let mut batch = NormalizedBatch::new(source_file.clone());
    batch.errors.push(ErrorEntry::File {
        source_file,
        cause: cause.to_string(),
    });
    batch
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Column positions resolved from the header row.
struct Columns {
    timestamp: Option<usize>,
    sensor_id: Option<usize>,
    value: usize,
    status: Option<usize>,
}

/// Borrowed view of one data row.
struct RawRow<'a> {
    timestamp: Option<&'a str>,
    sensor_id: Option<&'a str>,
    value: &'a str,
    status: Option<&'a str>,
}

impl Columns {
    /// Returns `None` when there is no `value` column.
    fn resolve(headers: &StringRecord) -> Option<Self> {
        // First occurrence wins on duplicate names.
        let mut map: HashMap<String, usize> = HashMap::new();
        for (idx, name) in headers.iter().enumerate() {
            map.entry(normalize_header_name(name)).or_insert(idx);
        }

        Some(Self {
            timestamp: map.get(COL_TIMESTAMP).copied(),
            sensor_id: map.get(COL_SENSOR_ID).copied(),
            value: *map.get(COL_VALUE)?,
            status: map.get(COL_STATUS).copied(),
        })
    }

    fn view<'a>(&self, record: &'a StringRecord) -> RawRow<'a> {
        RawRow {
            timestamp: self.timestamp.and_then(|i| record.get(i)),
            sensor_id: self.sensor_id.and_then(|i| record.get(i)),
            value: record.get(self.value).unwrap_or(""),
            status: self.status.and_then(|i| record.get(i)),
        }
    }
}

/// Trim and drop a UTF-8 BOM that spreadsheet exports prepend to the first header.
fn normalize_header_name(name: &str) -> String {
    name.trim().trim_start_matches('\u{feff}').trim().to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
