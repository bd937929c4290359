//! Quote source backed by a directory of CSV exports

use super::{FetchWindow, QuoteSource};
use crate::error::SourceError;
use forecast_rate::data::QuoteSeries;
use forecast_rate::ForecastError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reads `<dir>/<symbol>.csv` files with a `date,open,high,low,close` header.
///
/// The period of the window is applied relative to the last row of the file;
/// the interval is ignored since the files hold daily bars.
#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    dir: PathBuf,
}

impl CsvDirectorySource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File the series for `symbol` is read from
    pub fn path_for(&self, symbol: &str) -> PathBuf {
        self.dir.join(format!("{}.csv", symbol))
    }
}

impl QuoteSource for CsvDirectorySource {
    fn fetch(&self, symbol: &str, window: &FetchWindow) -> Result<QuoteSeries, SourceError> {
        let path = self.path_for(symbol);
        if !path.is_file() {
            return Err(SourceError::unavailable(
                symbol,
                format!("{} does not exist", path.display()),
            ));
        }

        let series = QuoteSeries::read_csv(&path).map_err(|err| match err {
            ForecastError::IoError(io) => SourceError::Io(io),
            other => SourceError::Parse(format!("{}: {}", path.display(), other)),
        })?;

        let Some(start) = series.last().and_then(|bar| window.start_for(bar.date)) else {
            return Ok(series);
        };
        let trimmed = QuoteSeries::from_bars(
            series
                .bars()
                .iter()
                .filter(|bar| bar.date >= start)
                .copied(),
        );
        debug!(symbol, rows = trimmed.len(), %start, "read csv series");
        Ok(trimmed)
    }

    fn name(&self) -> &str {
        "csv"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_reads_and_trims_to_period() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("USDTRY=X.csv"),
            "date,open,high,low,close\n\
             2024-01-01,29.5,29.6,29.4,29.5\n\
             2024-03-01,31.0,31.2,30.9,31.1\n\
             2024-03-04,31.1,31.3,31.0,31.2\n",
        )
        .unwrap();
        let source = CsvDirectorySource::new(dir.path());

        let month = source
            .fetch("USDTRY=X", &FetchWindow::new("1mo", "1d"))
            .unwrap();
        assert_eq!(month.len(), 2);

        let all = source
            .fetch("USDTRY=X", &FetchWindow::new("max", "1d"))
            .unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn test_missing_file_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let source = CsvDirectorySource::new(dir.path());
        assert!(matches!(
            source.fetch("GC=F", &FetchWindow::default()),
            Err(SourceError::Unavailable { .. })
        ));
    }

    #[test]
    fn test_malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("SI=F.csv"), "date,close\nyesterday,abc\n").unwrap();
        let source = CsvDirectorySource::new(dir.path());
        assert!(matches!(
            source.fetch("SI=F", &FetchWindow::default()),
            Err(SourceError::Parse(_))
        ));
    }
}
