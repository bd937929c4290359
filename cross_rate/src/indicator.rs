//! RSI aligned to a close series

use chrono::NaiveDate;
use forecast_rate::data::QuoteSeries;
use rate_math::{rsi_series, RsiZone};
use serde::Serialize;

/// One RSI reading, `None` during the warm-up window
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IndicatorPoint {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

/// RSI values on the same dates as the series they were computed from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSeries {
    period: usize,
    points: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Compute the RSI of the series' closes
    pub fn rsi(series: &QuoteSeries, period: usize) -> rate_math::Result<Self> {
        let values = rsi_series(&series.closes(), period)?;
        let points = series
            .dates()
            .into_iter()
            .zip(values)
            .map(|(date, value)| IndicatorPoint { date, value })
            .collect();
        Ok(Self { period, points })
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn points(&self) -> &[IndicatorPoint] {
        &self.points
    }

    pub fn values(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Most recent defined reading
    pub fn latest(&self) -> Option<(NaiveDate, f64)> {
        self.points
            .iter()
            .rev()
            .find_map(|p| p.value.map(|value| (p.date, value)))
    }

    pub fn latest_zone(&self) -> Option<RsiZone> {
        self.latest().map(|(_, value)| RsiZone::classify(value))
    }
}
