use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Placeholder stored when a row carries no timestamp.
pub const MISSING_TIMESTAMP: &str = "N/A";

/// Placeholder stored when a row carries no sensor identifier.
pub const UNKNOWN_SENSOR: &str = "Unknown";

/// One normalized reading, with its value expressed in pounds.
///
/// Records are produced by the normalizer and never modified afterwards;
/// fields are only reachable through accessors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    source_file: String,
    timestamp: String,
    sensor_id: String,
    value_lb: f64,
    original_value: String,
}

impl CanonicalRecord {
    /// Build a record, substituting the placeholders for absent or blank
    /// `timestamp` / `sensor_id` cells.
    pub fn new(
        source_file: impl Into<String>,
        timestamp: Option<&str>,
        sensor_id: Option<&str>,
        value_lb: f64,
        original_value: impl Into<String>,
    ) -> Self {
        Self {
            source_file: source_file.into(),
            timestamp: non_blank(timestamp).unwrap_or(MISSING_TIMESTAMP).to_string(),
            sensor_id: non_blank(sensor_id).unwrap_or(UNKNOWN_SENSOR).to_string(),
            value_lb,
            original_value: original_value.into(),
        }
    }

    /// File name (without directories) the reading came from.
    pub fn source_file(&self) -> &str {
        &self.source_file
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    /// Measured value in pounds.
    pub fn value_lb(&self) -> f64 {
        self.value_lb
    }

    /// The `value` cell exactly as it appeared in the source file.
    pub fn original_value(&self) -> &str {
        &self.original_value
    }
}

fn non_blank(cell: Option<&str>) -> Option<&str> {
    cell.filter(|s| !s.trim().is_empty())
}

/// A canonical record as read back from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedRecord {
    /// Store-assigned, monotonically increasing row id.
    pub id: i64,
    /// Batch timestamp shared by every row of one append call.
    pub processed_at: String,
    #[serde(flatten)]
    pub record: CanonicalRecord,
}

// ── Error log entries ─────────────────────────────────────────────────────────

/// Why a single row could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum RowFailure {
    /// The row has no `value` cell, or the cell is blank.
    #[error("value is empty")]
    MissingValue,

    /// The (unit-stripped) text is not a number.
    #[error("could not convert '{text}' to a number")]
    InvalidNumber { text: String },

    /// The text parsed, but to NaN or an infinity.
    #[error("'{text}' is not a finite number")]
    NonFiniteNumber { text: String },

    /// The CSV reader could not decode the record.
    #[error("unreadable CSV record: {message}")]
    Unreadable { message: String },
}

/// One entry of the error log returned next to the normalized records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "scope")]
pub enum ErrorEntry {
    /// A single row was rejected; the rest of the file was still processed.
    Row {
        /// 1-based line number in the source file (the header is line 1).
        row_index: usize,
        raw_value: String,
        failure: RowFailure,
    },
    /// The whole file could not be read; no records were produced.
    File { source_file: String, cause: String },
}

impl ErrorEntry {
    /// Line number of the rejected row, `None` for file-level failures.
    pub fn row_index(&self) -> Option<usize> {
        match self {
            ErrorEntry::Row { row_index, .. } => Some(*row_index),
            ErrorEntry::File { .. } => None,
        }
    }

    /// The raw `value` cell of a rejected row; empty for file-level failures.
    pub fn raw_value(&self) -> &str {
        match self {
            ErrorEntry::Row { raw_value, .. } => raw_value,
            ErrorEntry::File { .. } => "",
        }
    }

    pub fn is_file_level(&self) -> bool {
        matches!(self, ErrorEntry::File { .. })
    }
}

impl fmt::Display for ErrorEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorEntry::Row {
                row_index,
                raw_value,
                failure,
            } => write!(f, "Skipped Row {}: {} (Data: {})", row_index, failure, raw_value),
            ErrorEntry::File { source_file, cause } => {
                write!(f, "File Read Error: {} - {}", source_file, cause)
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_record_keeps_fields() {
        let record = CanonicalRecord::new(
            "data.csv",
            Some("2026-02-23 10:00"),
            Some("S01"),
            23.15,
            "10.5kg",
        );
        assert_eq!(record.source_file(), "data.csv");
        assert_eq!(record.timestamp(), "2026-02-23 10:00");
        assert_eq!(record.sensor_id(), "S01");
        assert_eq!(record.value_lb(), 23.15);
        assert_eq!(record.original_value(), "10.5kg");
    }

    #[test]
    fn test_canonical_record_defaults_for_absent_fields() {
        let record = CanonicalRecord::new("data.csv", None, None, 1.0, "1");
        assert_eq!(record.timestamp(), MISSING_TIMESTAMP);
        assert_eq!(record.sensor_id(), UNKNOWN_SENSOR);
    }

    #[test]
    fn test_canonical_record_defaults_for_blank_fields() {
        let record = CanonicalRecord::new("data.csv", Some("  "), Some(""), 1.0, "1");
        assert_eq!(record.timestamp(), "N/A");
        assert_eq!(record.sensor_id(), "Unknown");
    }

    #[test]
    fn test_row_error_display() {
        let entry = ErrorEntry::Row {
            row_index: 3,
            raw_value: "invalid".to_string(),
            failure: RowFailure::InvalidNumber {
                text: "invalid".to_string(),
            },
        };
        assert_eq!(
            entry.to_string(),
            "Skipped Row 3: could not convert 'invalid' to a number (Data: invalid)"
        );
        assert_eq!(entry.row_index(), Some(3));
        assert_eq!(entry.raw_value(), "invalid");
        assert!(!entry.is_file_level());
    }

    #[test]
    fn test_file_error_display() {
        let entry = ErrorEntry::File {
            source_file: "missing.csv".to_string(),
            cause: "no such file".to_string(),
        };
        assert_eq!(entry.to_string(), "File Read Error: missing.csv - no such file");
        assert_eq!(entry.row_index(), None);
        assert_eq!(entry.raw_value(), "");
        assert!(entry.is_file_level());
    }

    #[test]
    fn test_persisted_record_serializes_flat() {
        let persisted = PersistedRecord {
            id: 7,
            processed_at: "2026-02-23 12:00:00.000000".to_string(),
            record: CanonicalRecord::new("a.csv", Some("t"), Some("S01"), 2.5, "2.5"),
        };
        let json = serde_json::to_value(&persisted).unwrap();
        assert_eq!(json["id"], 7);
        assert_eq!(json["sensor_id"], "S01");
        assert_eq!(json["value_lb"], 2.5);
    }

    #[test]
    fn test_error_entry_serializes_with_scope_tag() {
        let entry = ErrorEntry::Row {
            row_index: 2,
            raw_value: "".to_string(),
            failure: RowFailure::MissingValue,
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["scope"], "row");
        assert_eq!(json["failure"]["kind"], "missing_value");
    }
}
