//! Forecasting a close series with a pluggable model backend

use crate::data::QuoteSeries;
use crate::error::{ForecastError, Result};
use crate::models::{ForecastModel, ForecastPoint, TrainedForecastModel};
use crate::utils::{future_dates, strictly_after};
use chrono::NaiveDate;
use crossbeam_channel::RecvTimeoutError;
use polars::prelude::DataFrame;
use serde::Serialize;
use std::panic::{self, AssertUnwindSafe};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

/// Fewest history points any forecast is attempted on
pub const MIN_HISTORY_POINTS: usize = 2;

/// Forecast for a close series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    /// History exactly as fed to the model
    history: QuoteSeries,
    /// Number of periods forecasted
    horizon: usize,
    forecast_dates: Vec<NaiveDate>,
    yhat: Vec<f64>,
    yhat_lower: Vec<f64>,
    yhat_upper: Vec<f64>,
    /// Name of the model that produced the forecast
    model: String,
}

impl ForecastResult {
    /// Assemble a result, rejecting output that breaks the forecast contract
    pub fn new(
        history: QuoteSeries,
        horizon: usize,
        points: Vec<ForecastPoint>,
        model: impl Into<String>,
    ) -> Result<Self> {
        if points.len() != horizon {
            return Err(ForecastError::ForecastUnavailable(format!(
                "Model returned {} rows for a horizon of {}",
                points.len(),
                horizon
            )));
        }

        let last_date = history.last().map(|bar| bar.date).ok_or_else(|| {
            ForecastError::DataError("Forecast history is empty".to_string())
        })?;
        let forecast_dates: Vec<NaiveDate> = points.iter().map(|p| p.date).collect();
        if !strictly_after(last_date, &forecast_dates) {
            return Err(ForecastError::ForecastUnavailable(
                "Forecast dates must be ascending and after the history".to_string(),
            ));
        }

        for point in &points {
            let finite = point.yhat.is_finite()
                && point.yhat_lower.is_finite()
                && point.yhat_upper.is_finite();
            if !finite || point.yhat_lower > point.yhat || point.yhat > point.yhat_upper {
                return Err(ForecastError::ForecastUnavailable(format!(
                    "Malformed forecast row for {}: {} <= {} <= {} does not hold",
                    point.date, point.yhat_lower, point.yhat, point.yhat_upper
                )));
            }
        }

        Ok(Self {
            history,
            horizon,
            forecast_dates,
            yhat: points.iter().map(|p| p.yhat).collect(),
            yhat_lower: points.iter().map(|p| p.yhat_lower).collect(),
            yhat_upper: points.iter().map(|p| p.yhat_upper).collect(),
            model: model.into(),
        })
    }

    pub fn history(&self) -> &QuoteSeries {
        &self.history
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn forecast_dates(&self) -> &[NaiveDate] {
        &self.forecast_dates
    }

    /// Point forecasts
    pub fn yhat(&self) -> &[f64] {
        &self.yhat
    }

    pub fn yhat_lower(&self) -> &[f64] {
        &self.yhat_lower
    }

    pub fn yhat_upper(&self) -> &[f64] {
        &self.yhat_upper
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Rows of the forecast, in date order
    pub fn points(&self) -> impl Iterator<Item = ForecastPoint> + '_ {
        (0..self.horizon).map(move |i| ForecastPoint {
            date: self.forecast_dates[i],
            yhat: self.yhat[i],
            yhat_lower: self.yhat_lower[i],
            yhat_upper: self.yhat_upper[i],
        })
    }

    /// Serialize the result to JSON
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .map_err(|e| ForecastError::DataError(format!("Cannot serialize forecast: {}", e)))
    }
}

/// Wraps a model backend with history checks, a timeout and output validation
#[derive(Debug, Clone)]
pub struct Forecaster<M: ForecastModel> {
    model: M,
    timeout: Option<Duration>,
    min_history: usize,
}

impl<M: ForecastModel> Forecaster<M> {
    /// Create a forecaster without a timeout
    pub fn new(model: M) -> Self {
        Self {
            model,
            timeout: None,
            min_history: MIN_HISTORY_POINTS,
        }
    }

    /// Abandon fits that take longer than `timeout`
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Require more history than the hard floor of two points
    pub fn with_min_history(mut self, min_history: usize) -> Result<Self> {
        if min_history < MIN_HISTORY_POINTS {
            return Err(ForecastError::InvalidParameter(format!(
                "Minimum history must be at least {}, got {}",
                MIN_HISTORY_POINTS, min_history
            )));
        }
        self.min_history = min_history;
        Ok(self)
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn min_history(&self) -> usize {
        self.min_history
    }

    /// Forecast `horizon` daily periods past the end of `history`.
    ///
    /// Fails with `InsufficientHistory` when `history` is shorter than the
    /// configured minimum and with `ForecastUnavailable` when the backend
    /// errors, panics, times out or returns malformed rows.
    pub fn forecast(&self, history: &QuoteSeries, horizon: usize) -> Result<ForecastResult> {
        if horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "Horizon must be at least one period".to_string(),
            ));
        }
        if history.len() < self.min_history {
            return Err(ForecastError::InsufficientHistory {
                required: self.min_history,
                actual: history.len(),
            });
        }

        let frame = history.to_model_frame()?;
        let last_date = history
            .last()
            .map(|bar| bar.date)
            .ok_or_else(|| ForecastError::DataError("Forecast history is empty".to_string()))?;
        let dates = future_dates(last_date, horizon)?;

        let outcome = match self.timeout {
            Some(timeout) => self.fit_with_timeout(frame, dates, timeout),
            None => self.fit_inline(&frame, &dates),
        };

        let points = outcome.map_err(|err| {
            warn!(model = self.model.name(), error = %err, "forecast unavailable");
            match err {
                ForecastError::ForecastUnavailable(_) => err,
                other => ForecastError::ForecastUnavailable(other.to_string()),
            }
        })?;

        debug!(
            model = self.model.name(),
            history = history.len(),
            horizon,
            "forecast complete"
        );
        ForecastResult::new(history.clone(), horizon, points, self.model.name())
    }

    fn fit_inline(&self, frame: &DataFrame, dates: &[NaiveDate]) -> Result<Vec<ForecastPoint>> {
        panic::catch_unwind(AssertUnwindSafe(|| fit_and_predict(&self.model, frame, dates)))
            .unwrap_or_else(|_| {
                Err(ForecastError::ForecastUnavailable(
                    "Model panicked during fit".to_string(),
                ))
            })
    }

    fn fit_with_timeout(
        &self,
        frame: DataFrame,
        dates: Vec<NaiveDate>,
        timeout: Duration,
    ) -> Result<Vec<ForecastPoint>> {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let model = self.model.clone();

        thread::Builder::new()
            .name("forecast-fit".to_string())
            .spawn(move || {
                // The receiver may have given up already
                let _ = tx.send(fit_and_predict(&model, &frame, &dates));
            })
            .map_err(|e| {
                ForecastError::ForecastUnavailable(format!("Cannot start fit worker: {}", e))
            })?;

        match rx.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout) => Err(ForecastError::ForecastUnavailable(format!(
                "Model fit exceeded {:?}",
                timeout
            ))),
            Err(RecvTimeoutError::Disconnected) => Err(ForecastError::ForecastUnavailable(
                "Fit worker exited without a result".to_string(),
            )),
        }
    }
}

fn fit_and_predict<M: ForecastModel>(
    model: &M,
    frame: &DataFrame,
    dates: &[NaiveDate],
) -> Result<Vec<ForecastPoint>> {
    let trained = model.train(frame)?;
    trained.predict(dates)
}
