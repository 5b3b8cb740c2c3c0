use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while building, parsing or exporting records.
#[derive(Debug, Error)]
pub enum Error {
    /// A document key without a sensible default was absent.
    #[error("missing required key '{key}'")]
    MissingKey { key: String },

    /// A document key was present but held the wrong JSON type.
    #[error("field '{key}' should be {expected}")]
    InvalidField { key: String, expected: &'static str },

    /// Two sequences that must line up do not.
    #[error("{context}: expected {expected} values, found {found}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        found: usize,
    },

    /// A zero showed up as a divisor during unit conversion.
    #[error("{context}: division by zero at index {index}")]
    DivisionByZero { context: String, index: usize },

    /// A signal needs an axis to be converted between unit spaces.
    #[error("record '{record}' has no axis")]
    MissingAxis { record: String },

    #[error("no setpoint available for {what}")]
    MissingSetpoint { what: &'static str },

    #[error("unknown signal space '{0}', expected 'lambda' or 'sigma'")]
    UnknownSignalSpace(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Arrow(#[from] arrow::error::ArrowError),

    #[error(transparent)]
    Parquet(#[from] parquet::errors::ParquetError),
}

impl Error {
    pub(crate) fn missing_key(key: impl Into<String>) -> Self {
        Error::MissingKey { key: key.into() }
    }

    pub(crate) fn invalid_field(key: impl Into<String>, expected: &'static str) -> Self {
        Error::InvalidField {
            key: key.into(),
            expected,
        }
    }

    pub(crate) fn shape_mismatch(context: impl Into<String>, expected: usize, found: usize) -> Self {
        Error::ShapeMismatch {
            context: context.into(),
            expected,
            found,
        }
    }
}
