//! Batch orchestration for sensorlog.
//!
//! Drives input files through the normalizer and store, and turns the stored
//! dataset into the dated report artifact.

pub mod pipeline;

pub use sensorlog_core as core;
pub use sensorlog_data as data;
