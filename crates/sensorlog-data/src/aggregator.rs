//! Summary statistics over persisted readings.
//!
//! Produces the global count/mean/max/min, a per-sensor mean table and a
//! PASS/WARN classification, rendered as the plain-text report.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use sensorlog_core::clock::DISPLAY_FORMAT;
use sensorlog_core::formatting::format_pounds;
use sensorlog_core::models::PersistedRecord;
use serde::Serialize;

/// Lower bound (inclusive) of the acceptable global mean, in pounds.
pub const PASS_MIN_LB: f64 = 50.0;

/// Upper bound (inclusive) of the acceptable global mean, in pounds.
pub const PASS_MAX_LB: f64 = 80.0;

// ── SensorStats ───────────────────────────────────────────────────────────────

/// Running totals for a set of readings.
#[derive(Debug, Clone, Copy)]
struct SensorStats {
    sum: f64,
    count: usize,
    max: f64,
    min: f64,
}

impl Default for SensorStats {
    fn default() -> Self {
        Self {
            sum: 0.0,
            count: 0,
            max: f64::NEG_INFINITY,
            min: f64::INFINITY,
        }
    }
}

impl SensorStats {
    fn add(&mut self, value: f64) {
        self.sum += value;
        self.count += 1;
        self.max = self.max.max(value);
        self.min = self.min.min(value);
    }

    fn mean(&self) -> f64 {
        self.sum / self.count as f64
    }
}

// ── Report ────────────────────────────────────────────────────────────────────

/// Outcome of the global-mean range check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Classification {
    Pass,
    Warn,
}

impl Classification {
    /// `Pass` when `mean` lies in `[PASS_MIN_LB, PASS_MAX_LB]`.
    pub fn from_mean(mean: f64) -> Self {
        if (PASS_MIN_LB..=PASS_MAX_LB).contains(&mean) {
            Classification::Pass
        } else {
            Classification::Warn
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Pass => write!(f, "PASS"),
            Classification::Warn => write!(f, "WARN"),
        }
    }
}

/// Mean reading of one sensor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorSummary {
    pub sensor_id: String,
    pub count: usize,
    pub mean: f64,
}

/// Aggregate view of the whole dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub generated_at: NaiveDateTime,
    pub count: usize,
    pub mean: f64,
    pub max: f64,
    pub min: f64,
    /// Sorted by `sensor_id`, ascending.
    pub per_sensor: Vec<SensorSummary>,
    pub status: Classification,
}

impl Report {
    /// Pretty-printed JSON form of the report.
    pub fn to_json(&self) -> sensorlog_core::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(40);
        writeln!(f, "{rule}")?;
        writeln!(f, "  Sensor Data Report")?;
        writeln!(f, "  Generated: {}", self.generated_at.format(DISPLAY_FORMAT))?;
        writeln!(f, "{rule}")?;
        writeln!(f)?;
        writeln!(f, "[Overall]")?;
        writeln!(f, "  - Records : {}", self.count)?;
        writeln!(f, "  - Mean    : {}", format_pounds(self.mean))?;
        writeln!(f, "  - Max     : {}", format_pounds(self.max))?;
        writeln!(f, "  - Min     : {}", format_pounds(self.min))?;
        writeln!(f)?;
        writeln!(f, "[Mean by sensor]")?;

        let width = self
            .per_sensor
            .iter()
            .map(|s| s.sensor_id.chars().count())
            .max()
            .unwrap_or(0)
            .max("sensor_id".len());
        writeln!(f, "  {:<width$}  {:>6}  {:>14}", "sensor_id", "count", "mean")?;
        for sensor in &self.per_sensor {
            writeln!(
                f,
                "  {:<width$}  {:>6}  {:>14}",
                sensor.sensor_id,
                sensor.count,
                format_pounds(sensor.mean)
            )?;
        }

        writeln!(f)?;
        writeln!(f, "[Status]")?;
        let placement = match self.status {
            Classification::Pass => "within",
            Classification::Warn => "outside",
        };
        writeln!(
            f,
            "  Status: {} (mean {} {}-{} lb)",
            self.status, placement, PASS_MIN_LB, PASS_MAX_LB
        )?;
        writeln!(f)?;
        writeln!(f, "{rule}")
    }
}

/// Result of [`Aggregator::report`].
#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    Generated(Report),
    /// The dataset was empty; no report exists.
    NoData,
}

// ── Aggregator ────────────────────────────────────────────────────────────────

/// Stateless helper that summarizes persisted records.
pub struct Aggregator;

impl Aggregator {
    /// Summarize `records`, stamping the report with `generated_at`.
    pub fn report(records: &[PersistedRecord], generated_at: NaiveDateTime) -> ReportOutcome {
        if records.is_empty() {
            return ReportOutcome::NoData;
        }

        let mut overall = SensorStats::default();
        // BTreeMap keeps sensors in ascending lexical order.
        let mut by_sensor: BTreeMap<&str, SensorStats> = BTreeMap::new();

        for persisted in records {
            let value = persisted.record.value_lb();
            overall.add(value);
            by_sensor
                .entry(persisted.record.sensor_id())
                .or_default()
                .add(value);
        }

        let mean = overall.mean();
        let per_sensor = by_sensor
            .into_iter()
            .map(|(sensor_id, stats)| SensorSummary {
                sensor_id: sensor_id.to_string(),
                count: stats.count,
                mean: stats.mean(),
            })
            .collect();

        ReportOutcome::Generated(Report {
            generated_at,
            count: overall.count,
            mean,
            max: overall.max,
            min: overall.min,
            per_sensor,
            status: Classification::from_mean(mean),
        })
    }
}

/// Artifact name for a report generated on `date`, e.g. `report20260223.txt`.
pub fn report_file_name(date: NaiveDate) -> String {
    format!("report{}.txt", date.format("%Y%m%d"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use sensorlog_core::models::CanonicalRecord;

    fn generated_at() -> NaiveDateTime {
        NaiveDateTime::parse_from_str("2026-02-23 18:30:00", DISPLAY_FORMAT).unwrap()
    }

    fn persisted(id: i64, sensor: &str, value: f64) -> PersistedRecord {
        PersistedRecord {
            id,
            processed_at: "2026-02-23 12:00:00.000000".to_string(),
            record: CanonicalRecord::new("a.csv", Some("t"), Some(sensor), value, value.to_string()),
        }
    }

    fn unwrap_report(outcome: ReportOutcome) -> Report {
        match outcome {
            ReportOutcome::Generated(report) => report,
            ReportOutcome::NoData => panic!("expected a report"),
        }
    }

    // ── report ────────────────────────────────────────────────────────────────

    #[test]
    fn test_report_empty_is_no_data() {
        assert_eq!(Aggregator::report(&[], generated_at()), ReportOutcome::NoData);
    }

    #[test]
    fn test_report_low_mean_warns() {
        let records = vec![persisted(1, "S01", 10.0), persisted(2, "S02", 20.0), persisted(3, "S01", 30.0)];
        let report = unwrap_report(Aggregator::report(&records, generated_at()));

        assert_eq!(report.count, 3);
        assert!((report.mean - 20.0).abs() < 1e-9);
        assert_eq!(report.max, 30.0);
        assert_eq!(report.min, 10.0);
        assert_eq!(report.status, Classification::Warn);
    }

    #[test]
    fn test_report_mid_mean_passes() {
        let records = vec![persisted(1, "S01", 60.0), persisted(2, "S02", 70.0)];
        let report = unwrap_report(Aggregator::report(&records, generated_at()));

        assert!((report.mean - 65.0).abs() < 1e-9);
        assert_eq!(report.status, Classification::Pass);
    }

    #[test]
    fn test_report_single_record() {
        let records = vec![persisted(1, "S01", -4.5)];
        let report = unwrap_report(Aggregator::report(&records, generated_at()));
        assert_eq!(report.count, 1);
        assert_eq!(report.mean, -4.5);
        assert_eq!(report.max, -4.5);
        assert_eq!(report.min, -4.5);
    }

    #[test]
    fn test_report_per_sensor_sorted_ascending() {
        let records = vec![
            persisted(1, "S10", 1.0),
            persisted(2, "S02", 2.0),
            persisted(3, "Unknown", 3.0),
            persisted(4, "S02", 4.0),
        ];
        let report = unwrap_report(Aggregator::report(&records, generated_at()));

        let ids: Vec<&str> = report.per_sensor.iter().map(|s| s.sensor_id.as_str()).collect();
        assert_eq!(ids, vec!["S02", "S10", "Unknown"]);
        assert_eq!(report.per_sensor[0].count, 2);
        assert!((report.per_sensor[0].mean - 3.0).abs() < 1e-9);
    }

    // ── Classification ────────────────────────────────────────────────────────

    #[test]
    fn test_classification_bounds_inclusive() {
        assert_eq!(Classification::from_mean(50.0), Classification::Pass);
        assert_eq!(Classification::from_mean(80.0), Classification::Pass);
        assert_eq!(Classification::from_mean(49.99), Classification::Warn);
        assert_eq!(Classification::from_mean(80.01), Classification::Warn);
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    #[test]
    fn test_report_text_contains_all_sections() {
        let records = vec![persisted(1, "S02", 10.0), persisted(2, "S01", 20.0), persisted(3, "S01", 30.0)];
        let text = unwrap_report(Aggregator::report(&records, generated_at())).to_string();

        assert!(text.contains("Generated: 2026-02-23 18:30:00"));
        assert!(text.contains("Records : 3"));
        assert!(text.contains("Mean    : 20.00 lb"));
        assert!(text.contains("Max     : 30.00 lb"));
        assert!(text.contains("Min     : 10.00 lb"));
        assert!(text.contains("Status: WARN"));

        let s01 = text.find("S01").unwrap();
        let s02 = text.find("S02").unwrap();
        assert!(s01 < s02, "sensor table must be ascending");
        assert!(text.contains("25.00 lb"));
    }

    #[test]
    fn test_report_json() {
        let records = vec![persisted(1, "S01", 60.0), persisted(2, "S01", 70.0)];
        let report = unwrap_report(Aggregator::report(&records, generated_at()));
        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(json["count"], 2);
        assert_eq!(json["status"], "PASS");
        assert_eq!(json["per_sensor"][0]["sensor_id"], "S01");
    }

    // ── report_file_name ──────────────────────────────────────────────────────

    #[test]
    fn test_report_file_name_uses_date() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 3).unwrap();
        assert_eq!(report_file_name(date), "report20260203.txt");
    }
}
