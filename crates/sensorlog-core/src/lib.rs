//! Shared domain model for sensorlog.
//!
//! Holds the record and error-log types exchanged between the normalizer,
//! the store and the aggregator, plus the clock, settings and number
//! formatting helpers used by every other crate.

pub mod clock;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;

pub use error::{Result, SensorlogError};
