//! Forecasting model backends
//!
//! A backend trains on the two-column (`ds`, `y`) model frame and predicts a
//! point estimate plus an uncertainty band for arbitrary dates. The
//! [`crate::forecaster::Forecaster`] wraps a backend with history checks,
//! a timeout and output validation.

use crate::error::Result;
use chrono::NaiveDate;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// One predicted row
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    /// Point forecast
    pub yhat: f64,
    /// Lower bound of the uncertainty interval
    pub yhat_lower: f64,
    /// Upper bound of the uncertainty interval
    pub yhat_upper: f64,
}

/// Trained forecast model
pub trait TrainedForecastModel: Debug + Send {
    /// Predict one row per requested date, in the order given
    fn predict(&self, dates: &[NaiveDate]) -> Result<Vec<ForecastPoint>>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Forecast model that can be trained on a model frame
pub trait ForecastModel: Debug + Clone + Send + 'static {
    /// The type of trained model produced
    type Trained: TrainedForecastModel;

    /// Train the model on a (`ds`, `y`) frame sorted by date with unique dates
    fn train(&self, frame: &DataFrame) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

pub mod additive_trend;
pub mod least_squares;

pub use additive_trend::{AdditiveTrendModel, TrainedAdditiveTrend};
