//! # Cross Rate
//!
//! Uniform base-currency price series for currency pairs, precious metals
//! and synthetic cross-rates, with RSI readings and short-horizon forecasts.
//!
//! ## Pipeline
//!
//! 1. The base rate (e.g. `USDTRY=X`) is fetched once from a [`QuoteSource`]
//! 2. Each instrument's own quotes are converted according to its
//!    [`PricingMode`] by [`normalizer::derive`]
//! 3. The RSI of the derived closes is computed
//! 4. A trend/seasonality forecast is fitted when a horizon is requested
//!
//! ## Quick Start
//!
//! ```no_run
//! use cross_rate::{Catalog, CsvDirectorySource, Pipeline};
//! use std::sync::Arc;
//!
//! let catalog = Catalog::builtin();
//! let pipeline = Pipeline::new(Arc::new(CsvDirectorySource::new("data")));
//!
//! let gold = catalog.require("Gram Gold")?;
//! let result = pipeline.run(gold, 7, true);
//! println!("{}: {:?} ({})", gold.name(), result.latest_price, result.status);
//! # Ok::<(), cross_rate::ConfigError>(())
//! ```

pub mod cache;
pub mod catalog;
pub mod config;
pub mod error;
pub mod indicator;
pub mod instrument;
pub mod normalizer;
pub mod pipeline;
pub mod portfolio;
pub mod source;

// Re-export commonly used types
pub use crate::cache::{NoCache, SeriesCache, TtlSeriesCache};
pub use crate::catalog::Catalog;
pub use crate::config::PipelineConfig;
pub use crate::error::{ConfigError, DerivationError, PortfolioError, SourceError};
pub use crate::indicator::IndicatorSeries;
pub use crate::instrument::{Instrument, PricingMode, GRAMS_PER_TROY_OUNCE};
pub use crate::pipeline::{
    ForecastOutcome, Pipeline, PipelineResult, PipelineStatus, TrendDirection,
};
pub use crate::portfolio::{Holding, Portfolio, Valuation};
pub use crate::source::{
    CsvDirectorySource, FetchWindow, MemorySource, QuoteSource, YahooChartSource,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
