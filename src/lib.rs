//! Spectroscopy measurement records.
//!
//! Samples, calibration spectra, signal axes and temperature sensors are held
//! as nested plain data ([`Record`] → [`Spectrum`] → [`Measurement`] →
//! [`Experiment`]), round-tripped through JSON documents, and flattened into
//! tables for CSV or Parquet export.

pub mod config;
pub mod data;
pub mod error;
pub mod table;

pub use config::{ExportConfig, ExportFormat};
pub use data::experiment::Experiment;
pub use data::measurement::Measurement;
pub use data::record::{Record, RecordRole, Values};
pub use data::spectrum::{SignalSpace, Spectrum, TemperatureSummary};
pub use error::{Error, Result};
pub use table::{Cell, Table};
