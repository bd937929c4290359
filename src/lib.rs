//! # Cross Rate Workspace
//!
//! Umbrella crate re-exporting the workspace members:
//!
//! - [`rate_math`]: rolling means, RSI and its zones
//! - [`forecast_rate`]: quote series, CSV I/O and forecasting
//! - [`cross_rate`]: instruments, quote sources, normalization and the pipeline
//!
//! ## Example
//!
//! ```
//! use chrono::NaiveDate;
//! use cross_rate_workspace::cross_rate::{Instrument, MemorySource, Pipeline, PricingMode};
//! use cross_rate_workspace::forecast_rate::QuoteSeries;
//! use std::sync::Arc;
//!
//! let day = |d| NaiveDate::from_ymd_opt(2024, 3, d).unwrap();
//! let source = MemorySource::new()
//!     .with_series("USDTRY=X", QuoteSeries::from_closes(vec![(day(1), 30.0), (day(4), 31.0)]))
//!     .with_series("GC=F", QuoteSeries::from_closes(vec![(day(1), 2000.0), (day(4), 2100.0)]));
//!
//! let gold = Instrument::new("Gram Gold", "GC=F", PricingMode::GoldCalc);
//! let result = Pipeline::new(Arc::new(source)).run(&gold, 0, false);
//!
//! assert!(result.is_ok());
//! assert_eq!(result.series.len(), 2);
//! ```

pub use cross_rate;
pub use forecast_rate;
pub use rate_math;
