//! Quote sources
//!
//! A [`QuoteSource`] returns the daily bars for one symbol over a
//! [`FetchWindow`]. It may fail, or succeed with an empty series; callers go
//! through [`fetch_with_retry`] which treats both the same way.

use crate::error::SourceError;
use chrono::{Datelike, Days, Months, NaiveDate};
use forecast_rate::data::QuoteSeries;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;
use tracing::warn;

pub mod csv_dir;
pub mod memory;
pub mod yahoo;

pub use csv_dir::CsvDirectorySource;
pub use memory::MemorySource;
pub use yahoo::YahooChartSource;

/// Attempts made per symbol before giving up
pub const MAX_FETCH_ATTEMPTS: usize = 2;

/// Look-back range and bar interval of a fetch, in Yahoo notation
/// (`5d`, `1mo`, `1y`, `max`; `1d`, `1wk`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FetchWindow {
    pub period: String,
    pub interval: String,
}

impl FetchWindow {
    pub fn new(period: impl Into<String>, interval: impl Into<String>) -> Self {
        Self {
            period: period.into(),
            interval: interval.into(),
        }
    }

    /// First date covered by the period when it ends on `last`.
    ///
    /// `None` for `max` and for periods that cannot be parsed.
    pub fn start_for(&self, last: NaiveDate) -> Option<NaiveDate> {
        let period = self.period.trim();
        if period == "ytd" {
            return NaiveDate::from_ymd_opt(last.year(), 1, 1);
        }

        let split = period.find(|c: char| !c.is_ascii_digit())?;
        let (count, unit) = period.split_at(split);
        let count: u32 = count.parse().ok()?;

        match unit {
            "d" => last.checked_sub_days(Days::new(u64::from(count))),
            "wk" => last.checked_sub_days(Days::new(u64::from(count) * 7)),
            "mo" => last.checked_sub_months(Months::new(count)),
            "y" => last.checked_sub_months(Months::new(count.checked_mul(12)?)),
            _ => None,
        }
    }
}

impl Default for FetchWindow {
    fn default() -> Self {
        Self::new("1y", "1d")
    }
}

/// Provider of dated OHLC series
pub trait QuoteSource: Debug + Send + Sync {
    /// Fetch the series for `symbol` over `window`
    fn fetch(&self, symbol: &str, window: &FetchWindow) -> Result<QuoteSeries, SourceError>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

impl<S: QuoteSource + ?Sized> QuoteSource for Arc<S> {
    fn fetch(&self, symbol: &str, window: &FetchWindow) -> Result<QuoteSeries, SourceError> {
        (**self).fetch(symbol, window)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Fetch with at most one retry.
///
/// An empty series counts as a failure and becomes [`SourceError::Empty`]
/// when it is the last outcome.
pub fn fetch_with_retry(
    source: &dyn QuoteSource,
    symbol: &str,
    window: &FetchWindow,
) -> Result<QuoteSeries, SourceError> {
    let mut last_error = SourceError::Empty(symbol.to_string());

    for attempt in 1..=MAX_FETCH_ATTEMPTS {
        match source.fetch(symbol, window) {
            Ok(series) if !series.is_empty() => return Ok(series),
            Ok(_) => last_error = SourceError::Empty(symbol.to_string()),
            Err(err) => last_error = err,
        }
        warn!(
            source = source.name(),
            symbol,
            attempt,
            error = %last_error,
            "fetch failed"
        );
    }

    Err(last_error)
}
