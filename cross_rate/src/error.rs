//! Error types for the cross_rate crate

use std::path::PathBuf;
use thiserror::Error;

/// Failure to obtain a series from a quote source
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source has no data for the symbol or refused the request
    #[error("Source unavailable for {symbol}: {reason}")]
    Unavailable { symbol: String, reason: String },

    /// The source answered with zero usable rows
    #[error("Source returned no rows for {0}")]
    Empty(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The response or file could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SourceError {
    pub fn unavailable(symbol: impl Into<String>, reason: impl Into<String>) -> Self {
        SourceError::Unavailable {
            symbol: symbol.into(),
            reason: reason.into(),
        }
    }
}

/// Reasons a base-currency series cannot be derived
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DerivationError {
    #[error("Base series is empty")]
    EmptyBase,

    #[error("No target series supplied for {0}")]
    MissingTarget(String),

    #[error("Base and target series share no dates")]
    NoOverlap,

    /// Every computed row was non-finite or not strictly positive
    #[error("No valid rows remain after conversion")]
    NoValidRows,
}

/// Catalog and environment configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid catalog: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Duplicate instrument name: {0}")]
    DuplicateInstrument(String),

    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Errors building a portfolio
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PortfolioError {
    #[error("Quantity for {name} must be finite and positive, got {quantity}")]
    InvalidQuantity { name: String, quantity: f64 },

    #[error("Cannot parse holding '{0}', expected NAME=QUANTITY")]
    InvalidHolding(String),
}
