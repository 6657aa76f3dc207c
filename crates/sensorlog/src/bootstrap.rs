use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ── Directory bootstrap ────────────────────────────────────────────────────────

/// Create the directories the run writes into, if absent.
///
/// - the report directory
/// - the parent directory of the database file
pub fn ensure_directories(report_dir: &Path, db_path: &Path) -> anyhow::Result<()> {
    std::fs::create_dir_all(report_dir)
        .with_context(|| format!("creating report dir {}", report_dir.display()))?;
    if let Some(parent) = db_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating database dir {}", parent.display()))?;
    }
    Ok(())
}

// ── Logging bootstrap ──────────────────────────────────────────────────────────

/// Map a CLI log-level name to a `tracing` filter directive.
///
/// Unrecognised names fall back to `"info"`.
pub fn level_directive(log_level: &str) -> &'static str {
    match log_level.to_uppercase().as_str() {
        "DEBUG" => "debug",
        "INFO" => "info",
        "WARNING" => "warn",
        "ERROR" | "CRITICAL" => "error",
        _ => "info",
    }
}

/// Initialise the global `tracing` subscriber.
///
/// Logs go to stderr; when `log_file` is given they are also appended to that
/// file without ANSI colours.
pub fn setup_logging(log_level: &str, log_file: Option<&PathBuf>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_new(level_directive(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_directories_creates_both() {
        let tmp = TempDir::new().expect("tempdir");
        let reports = tmp.path().join("out").join("reports");
        let db = tmp.path().join("data").join("sensors.db");

        ensure_directories(&reports, &db).expect("ensure_directories should succeed");

        assert!(reports.is_dir(), "report dir must exist");
        assert!(tmp.path().join("data").is_dir(), "db parent must exist");
        assert!(!db.exists(), "db file itself is left to the store");
    }

    #[test]
    fn test_ensure_directories_bare_db_name() {
        let tmp = TempDir::new().expect("tempdir");
        ensure_directories(tmp.path(), Path::new("research_data.db"))
            .expect("a db path without parent is fine");
    }

    #[test]
    fn test_ensure_directories_fails_when_blocked_by_file() {
        let tmp = TempDir::new().expect("tempdir");
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();

        let err = ensure_directories(&blocker.join("reports"), Path::new("x.db")).unwrap_err();
        assert!(err.to_string().contains("creating report dir"));
    }

    #[test]
    fn test_level_directive_mapping() {
        assert_eq!(level_directive("DEBUG"), "debug");
        assert_eq!(level_directive("info"), "info");
        assert_eq!(level_directive("WARNING"), "warn");
        assert_eq!(level_directive("ERROR"), "error");
        assert_eq!(level_directive("CRITICAL"), "error");
        assert_eq!(level_directive("chatty"), "info");
    }
}
