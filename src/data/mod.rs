//! Data layer: the record hierarchy and its JSON documents.
//!
//! Architecture:
//! ```text
//!   Record ──► Spectrum ──► Measurement ──► Experiment
//!   (axes)     (signals in     (parameters,     (results,
//!               cm-1 and µm)    spectra)         flattening)
//!        │           │              │                │
//!        └───────────┴──── document ┴────────────────┘
//!              to_dict / from_dict over serde_json::Value
//! ```

mod document;
pub mod experiment;
pub mod measurement;
pub mod record;
pub mod spectrum;
