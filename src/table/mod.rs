//! Tabular layer: the flat tables results are flattened into, and their
//! writers.
//!
//! ```text
//!   Experiment::results_to_nested_dict
//!        │
//!        ▼
//!   ┌────────┐
//!   │ frame   │  Table / Cell, row-wise stacking with Null padding
//!   └────────┘
//!        │
//!        ▼
//!   ┌────────┐
//!   │ export  │  CSV (csv), Parquet (arrow + parquet)
//!   └────────┘
//! ```

pub mod export;
pub mod frame;

pub use frame::{Cell, Column, Table};
