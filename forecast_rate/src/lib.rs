//! # Forecast Rate
//!
//! Daily quote series handling and short-horizon forecasting for exchange
//! rates and derived cross-rates.
//!
//! ## Features
//!
//! - Date-indexed OHLC series with validation, CSV import and export
//! - Reduction of a series to the two-column (`ds`, `y`) model frame
//! - A pluggable model backend behind [`models::ForecastModel`]
//! - An additive trend/seasonality model with simulated uncertainty bands
//! - A [`Forecaster`] that enforces minimum history, output shape and an
//!   optional fit timeout
//!
//! ## Quick Start
//!
//! ```no_run
//! use forecast_rate::data::QuoteSeries;
//! use forecast_rate::models::AdditiveTrendModel;
//! use forecast_rate::Forecaster;
//! use std::time::Duration;
//!
//! let history = QuoteSeries::read_csv("USDTRY.csv")?;
//!
//! let forecaster = Forecaster::new(AdditiveTrendModel::new())
//!     .with_timeout(Duration::from_secs(30));
//! let forecast = forecaster.forecast(&history, 7)?;
//!
//! for point in forecast.points() {
//!     println!("{} {:.4} [{:.4}, {:.4}]", point.date, point.yhat, point.yhat_lower, point.yhat_upper);
//! }
//! # Ok::<(), forecast_rate::ForecastError>(())
//! ```

pub mod data;
pub mod error;
pub mod forecaster;
pub mod models;
pub mod utils;

// Re-export commonly used types
pub use crate::data::{Bar, QuoteSeries};
pub use crate::error::ForecastError;
pub use crate::forecaster::{ForecastResult, Forecaster, MIN_HISTORY_POINTS};
pub use crate::models::{AdditiveTrendModel, ForecastModel, ForecastPoint, TrainedForecastModel};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
