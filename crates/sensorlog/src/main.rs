mod bootstrap;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use sensorlog_core::clock::{Clock, SystemClock};
use sensorlog_core::formatting::format_pounds;
use sensorlog_core::settings::Settings;
use sensorlog_data::aggregator::ReportOutcome;
use sensorlog_data::store::{Store, StoreConfig};
use sensorlog_runtime::pipeline::{Pipeline, PipelineConfig, RunSummary, SaveStatus};

fn main() -> Result<()> {
    let settings = Settings::load()?;

    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;
    bootstrap::ensure_directories(&settings.report_dir, &settings.db)?;

    tracing::info!("sensorlog v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Input: {}, DB: {}, Reports: {}",
        settings.input_dir.display(),
        settings.db.display(),
        settings.report_dir.display()
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store_config = StoreConfig::new(&settings.db)
        .with_busy_timeout(Duration::from_millis(settings.busy_timeout_ms));
    let pipeline = Pipeline::new(
        PipelineConfig {
            input_dir: settings.input_dir.clone(),
            report_dir: settings.report_dir.clone(),
        },
        Store::new(store_config, clock.clone()),
        clock,
    );

    pipeline.init()?;

    let summary = pipeline.ingest_all();
    print_summary(&summary);
    match pipeline.store().count() {
        Ok(n) => tracing::info!("Store holds {} records", n),
        Err(e) => tracing::warn!("Could not count stored records: {}", e),
    }

    if !settings.skip_report {
        match pipeline.build_report() {
            Ok(ReportOutcome::Generated(report)) => {
                let path = pipeline.write_report(&report)?;
                if settings.json {
                    println!("{}", report.to_json()?);
                } else {
                    println!(
                        "Report written: {} (mean {}, {})",
                        path.display(),
                        format_pounds(report.mean),
                        report.status
                    );
                }
            }
            Ok(ReportOutcome::NoData) => println!("No data stored yet; report skipped."),
            Err(e) => eprintln!("Report failed: {}", e),
        }
    }

    if let Some(limit) = settings.recent {
        let recent = pipeline.store().read_recent(limit)?;
        println!("Most recent {} records:", recent.len());
        for row in &recent {
            println!(
                "  #{:<6} {:<20} {:<10} {:>14}  ({}, {})",
                row.id,
                row.record.timestamp(),
                row.record.sensor_id(),
                format_pounds(row.record.value_lb()),
                row.record.original_value(),
                row.record.source_file()
            );
        }
    }

    Ok(())
}

/// One line per file, followed by the file's error log.
fn print_summary(summary: &RunSummary) {
    for file in &summary.files {
        let name = &file.batch.source_file;
        match &file.status {
            SaveStatus::Saved(n) => println!("{}: {} records saved", name, n),
            SaveStatus::NothingToSave => println!("{}: nothing to save", name),
            SaveStatus::StoreFailed(e) => eprintln!("{}: NOT saved ({})", name, e),
        }
        if file.batch.excluded > 0 {
            println!("  {} rows excluded by status", file.batch.excluded);
        }
        if !file.errors().is_empty() {
            eprintln!("  [!] {} errors:", file.errors().len());
            for entry in file.errors() {
                eprintln!("    {}", entry);
            }
        }
    }
    println!(
        "Total: {} records saved, {} errors, {} files",
        summary.total_saved(),
        summary.total_errors(),
        summary.files.len()
    );
}
