//! Daily quote series handling

use crate::error::{ForecastError, Result};
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Name of the date column in a model frame
pub const DATE_COLUMN: &str = "ds";
/// Name of the value column in a model frame
pub const VALUE_COLUMN: &str = "y";

/// `num_days_from_ce` of 1970-01-01
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// One daily OHLC bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    /// Trading date
    pub date: NaiveDate,
    /// Open price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Close price
    pub close: f64,
}

impl Bar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
        }
    }

    /// A bar whose four prices are all `price`
    pub fn flat(date: NaiveDate, price: f64) -> Self {
        Self::new(date, price, price, price, price)
    }

    /// All prices finite and strictly positive
    pub fn is_valid(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .all(|p| p.is_finite() && *p > 0.0)
    }
}

/// Date-indexed series of daily bars.
///
/// Dates are unique and ascending and every bar passes [`Bar::is_valid`].
/// Construction drops invalid bars and collapses duplicate dates, keeping the
/// bar supplied last for that date. Non-trading days are simply absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Bar>", into = "Vec<Bar>")]
pub struct QuoteSeries {
    bars: Vec<Bar>,
}

impl QuoteSeries {
    /// An empty series
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a series from bars in any order
    pub fn from_bars<I: IntoIterator<Item = Bar>>(bars: I) -> Self {
        let mut valid: Vec<Bar> = bars.into_iter().filter(Bar::is_valid).collect();
        // Stable, so equal dates keep their input order
        valid.sort_by_key(|bar| bar.date);

        let mut unique: Vec<Bar> = Vec::with_capacity(valid.len());
        for bar in valid {
            match unique.last_mut() {
                Some(last) if last.date == bar.date => *last = bar,
                _ => unique.push(bar),
            }
        }

        Self { bars: unique }
    }

    /// Build a close-only series; each bar is flat at its close
    pub fn from_closes<I: IntoIterator<Item = (NaiveDate, f64)>>(points: I) -> Self {
        Self::from_bars(points.into_iter().map(|(date, close)| Bar::flat(date, close)))
    }

    /// Load a series from a CSV file with a `date,open,high,low,close` header
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_csv_reader(file)
    }

    /// Load a series from any CSV source with a `date,open,high,low,close` header
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::Reader::from_reader(reader);
        let mut bars = Vec::new();
        for record in csv_reader.deserialize::<Bar>() {
            bars.push(record?);
        }
        Ok(Self::from_bars(bars))
    }

    /// Write the series as CSV to `path`
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.to_csv_writer(file)
    }

    /// Write the series as CSV (`date,open,high,low,close`) to `writer`
    pub fn to_csv_writer<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        if self.bars.is_empty() {
            csv_writer.write_record(["date", "open", "high", "low", "close"])?;
        }
        for bar in &self.bars {
            csv_writer.serialize(bar)?;
        }
        csv_writer.flush()?;
        Ok(())
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first(&self) -> Option<&Bar> {
        self.bars.first()
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Bar for `date`, if the series has one
    pub fn get(&self, date: NaiveDate) -> Option<&Bar> {
        self.bars
            .binary_search_by_key(&date, |bar| bar.date)
            .ok()
            .map(|idx| &self.bars[idx])
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.bars.iter().map(|bar| bar.date).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|bar| bar.close).collect()
    }

    /// Latest close
    pub fn latest_close(&self) -> Option<f64> {
        self.last().map(|bar| bar.close)
    }

    /// The two most recent bars, oldest first
    pub fn last_two(&self) -> Option<(&Bar, &Bar)> {
        match self.bars.as_slice() {
            [.., previous, last] => Some((previous, last)),
            _ => None,
        }
    }

    /// Percentage change between the two most recent closes
    pub fn price_change_pct(&self) -> Option<f64> {
        let (previous, last) = self.last_two()?;
        let pct = (last.close - previous.close) / previous.close * 100.0;
        pct.is_finite().then_some(pct)
    }

    /// Reduce the series to the two-column (`ds`, `y`) frame a model consumes.
    ///
    /// `ds` holds days since 1970-01-01, `y` the close.
    pub fn to_model_frame(&self) -> Result<DataFrame> {
        let days: Vec<i32> = self
            .bars
            .iter()
            .map(|bar| days_since_epoch(bar.date))
            .collect();
        let values: Vec<f64> = self.closes();

        let frame = DataFrame::new(vec![
            Series::new(DATE_COLUMN, days),
            Series::new(VALUE_COLUMN, values),
        ])?;
        Ok(frame)
    }
}

impl From<Vec<Bar>> for QuoteSeries {
    fn from(bars: Vec<Bar>) -> Self {
        Self::from_bars(bars)
    }
}

impl From<QuoteSeries> for Vec<Bar> {
    fn from(series: QuoteSeries) -> Self {
        series.bars
    }
}

/// Days between 1970-01-01 and `date`
pub fn days_since_epoch(date: NaiveDate) -> i32 {
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Inverse of [`days_since_epoch`]
pub fn date_from_epoch_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days.checked_add(UNIX_EPOCH_DAYS_FROM_CE)?)
}

/// Read the (`ds`, `y`) columns of a model frame back into points.
///
/// Fails on missing columns, nulls or non-finite values.
pub fn frame_points(frame: &DataFrame) -> Result<Vec<(NaiveDate, f64)>> {
    let days = frame.column(DATE_COLUMN)?.i32()?;
    let values = frame.column(VALUE_COLUMN)?.f64()?;

    let mut points = Vec::with_capacity(frame.height());
    for (day, value) in days.into_iter().zip(values.into_iter()) {
        let (day, value) = match (day, value) {
            (Some(day), Some(value)) => (day, value),
            _ => {
                return Err(ForecastError::DataError(
                    "Model frame contains nulls".to_string(),
                ))
            }
        };
        if !value.is_finite() {
            return Err(ForecastError::DataError(format!(
                "Model frame value is not finite: {}",
                value
            )));
        }
        let date = date_from_epoch_days(day).ok_or_else(|| {
            ForecastError::DataError(format!("Day number {} is out of range", day))
        })?;
        points.push((date, value));
    }

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_from_bars_sorts_and_keeps_last_duplicate() {
        let series = QuoteSeries::from_bars(vec![
            Bar::flat(date("2024-01-03"), 3.0),
            Bar::flat(date("2024-01-01"), 1.0),
            Bar::flat(date("2024-01-03"), 30.0),
        ]);

        assert_eq!(series.dates(), vec![date("2024-01-01"), date("2024-01-03")]);
        assert_eq!(series.closes(), vec![1.0, 30.0]);
    }

    #[test]
    fn test_invalid_bars_are_dropped() {
        let series = QuoteSeries::from_bars(vec![
            Bar::flat(date("2024-01-01"), 1.0),
            Bar::flat(date("2024-01-02"), 0.0),
            Bar::flat(date("2024-01-03"), -2.0),
            Bar::flat(date("2024-01-04"), f64::NAN),
            Bar::new(date("2024-01-05"), 1.0, f64::INFINITY, 1.0, 1.0),
        ]);
        assert_eq!(series.len(), 1);
    }

    #[test]
    fn test_epoch_day_round_trip() {
        assert_eq!(days_since_epoch(date("1970-01-01")), 0);
        assert_eq!(days_since_epoch(date("1970-01-11")), 10);
        assert_eq!(date_from_epoch_days(19_723), Some(date("2024-01-01")));
    }

    #[test]
    fn test_model_frame_has_two_columns() {
        let series = QuoteSeries::from_closes(vec![
            (date("2024-01-02"), 2.0),
            (date("2024-01-01"), 1.0),
        ]);
        let frame = series.to_model_frame().unwrap();

        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(
            frame_points(&frame).unwrap(),
            vec![(date("2024-01-01"), 1.0), (date("2024-01-02"), 2.0)]
        );
    }

    #[test]
    fn test_price_change_uses_last_two_bars() {
        let series = QuoteSeries::from_closes(vec![
            (date("2024-01-01"), 50.0),
            (date("2024-01-02"), 100.0),
            (date("2024-01-03"), 110.0),
        ]);
        assert_eq!(series.price_change_pct(), Some(10.0));
        assert_eq!(QuoteSeries::empty().price_change_pct(), None);
    }

    #[test]
    fn test_get_by_date() {
        let series = QuoteSeries::from_closes(vec![(date("2024-01-01"), 1.0)]);
        assert!(series.get(date("2024-01-01")).is_some());
        assert!(series.get(date("2024-01-02")).is_none());
    }
}
