use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the sensorlog crates outside the store layer.
#[derive(Error, Debug)]
pub enum SensorlogError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid UTF-8.
    #[error("File {0} is not valid UTF-8")]
    InvalidEncoding(PathBuf),

    /// The file has no header row at all.
    #[error("File {0} has no header row")]
    MissingHeader(PathBuf),

    /// The header row lacks a column the normalizer cannot do without.
    #[error("File {path} is missing required column `{column}`")]
    MissingColumn { path: PathBuf, column: String },

    /// The CSV structure could not be decoded.
    #[error("Malformed CSV in {path}: {message}")]
    MalformedCsv { path: PathBuf, message: String },

    /// A JSON document could not be produced or parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the sensorlog crates.
pub type Result<T> = std::result::Result<T, SensorlogError>;
