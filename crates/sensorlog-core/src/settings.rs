use clap::error::ErrorKind;
use clap::Parser;
use std::path::{Path, PathBuf};

use crate::error::{Result, SensorlogError};

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Ingest sensor CSV files, store them in SQLite and report statistics
#[derive(Parser, Debug, Clone)]
#[command(
    name = "sensorlog",
    about = "Ingest sensor CSV files, store them in SQLite and report statistics",
    version
)]
pub struct Settings {
    /// Directory scanned for `*.csv` input files
    #[arg(long, env = "SENSORLOG_INPUT_DIR", default_value = "input")]
    pub input_dir: PathBuf,

    /// SQLite database file
    #[arg(long, env = "SENSORLOG_DB", default_value = "research_data.db")]
    pub db: PathBuf,

    /// Directory the dated report file is written to
    #[arg(long, env = "SENSORLOG_REPORT_DIR", default_value = ".")]
    pub report_dir: PathBuf,

    /// Print the N most recent stored records after ingestion
    #[arg(long)]
    pub recent: Option<usize>,

    /// Do not generate a report
    #[arg(long)]
    pub skip_report: bool,

    /// Print the report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// SQLite busy timeout in milliseconds
    #[arg(long, default_value = "5000")]
    pub busy_timeout_ms: u64,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Parse process arguments and apply derived values.
    pub fn load() -> Result<Self> {
        Self::load_from(std::env::args_os())
    }

    /// Same as [`Settings::load`] but with an explicit argument list.
    pub fn load_from<I, T>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let mut settings = match Settings::try_parse_from(args) {
            Ok(s) => s,
            Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
                e.exit()
            }
            Err(e) => return Err(SensorlogError::Config(e.to_string())),
        };

        // --debug overrides log level.
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        settings.validate()?;
        Ok(settings)
    }

    /// Reject paths that exist but have the wrong kind.
    fn validate(&self) -> Result<()> {
        ensure_not_file(&self.input_dir, "input dir")?;
        ensure_not_file(&self.report_dir, "report dir")?;
        if self.db.is_dir() {
            return Err(SensorlogError::Config(format!(
                "db path {} is a directory",
                self.db.display()
            )));
        }
        if self.recent == Some(0) {
            return Err(SensorlogError::Config(
                "--recent must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn ensure_not_file(path: &Path, what: &str) -> Result<()> {
    if path.is_file() {
        return Err(SensorlogError::Config(format!(
            "{} {} is a file, expected a directory",
            what,
            path.display()
        )));
    }
    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
