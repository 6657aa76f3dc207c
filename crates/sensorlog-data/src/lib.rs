//! Ingestion, persistence and aggregation for sensorlog.
//!
//! Reads sensor CSV files into canonical records, stores them in SQLite one
//! batch per transaction, and summarizes the stored dataset into reports.

pub mod aggregator;
pub mod normalizer;
pub mod store;

pub use sensorlog_core as core;
