//! # Rate Math
//!
//! Indicator calculations over normalized close-price series.
//! Every calculation works on plain `f64` slices so the same code serves raw
//! quotes and derived cross-rates alike.

use thiserror::Error;

// Indicator modules
pub mod moving_averages;
pub mod oscillators;

pub use oscillators::{rsi_series, RelativeStrengthIndex, RsiZone, DEFAULT_RSI_PERIOD};

/// Errors that can occur in indicator calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for indicator operations
pub type Result<T> = std::result::Result<T, MathError>;
