//! In-memory quote source for tests and offline runs

use super::{FetchWindow, QuoteSource};
use crate::error::SourceError;
use forecast_rate::data::QuoteSeries;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Serves fixed series and counts every fetch per symbol.
///
/// Symbols without a series are unavailable. [`MemorySource::failing`]
/// makes the next `n` fetches of a symbol fail before it is served.
#[derive(Debug, Default)]
pub struct MemorySource {
    series: HashMap<String, QuoteSeries>,
    pending_failures: Mutex<HashMap<String, usize>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, symbol: impl Into<String>, series: QuoteSeries) -> Self {
        self.series.insert(symbol.into(), series);
        self
    }

    pub fn failing(self, symbol: impl Into<String>, times: usize) -> Self {
        self.pending_failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(symbol.into(), times);
        self
    }

    /// Number of fetches made for `symbol`
    pub fn calls(&self, symbol: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(symbol)
            .copied()
            .unwrap_or(0)
    }

    /// Number of fetches across all symbols
    pub fn total_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .sum()
    }
}

impl QuoteSource for MemorySource {
    fn fetch(&self, symbol: &str, _window: &FetchWindow) -> Result<QuoteSeries, SourceError> {
        *self
            .calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(symbol.to_string())
            .or_insert(0) += 1;

        {
            let mut failures = self
                .pending_failures
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if let Some(remaining) = failures.get_mut(symbol).filter(|n| **n > 0) {
                *remaining -= 1;
                return Err(SourceError::unavailable(symbol, "injected failure"));
            }
        }

        self.series
            .get(symbol)
            .cloned()
            .ok_or_else(|| SourceError::unavailable(symbol, "no such symbol"))
    }

    fn name(&self) -> &str {
        "memory"
    }
}
