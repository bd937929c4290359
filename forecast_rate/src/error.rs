//! Error types for the forecast_rate crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the forecast_rate crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// The history is too short for the model to fit
    #[error("Insufficient history: need at least {required} points, have {actual}")]
    InsufficientHistory { required: usize, actual: usize },

    /// The model failed, panicked, produced unusable output or timed out
    #[error("Forecast unavailable: {0}")]
    ForecastUnavailable(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from reading or writing CSV
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}
