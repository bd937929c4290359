//! The pipeline façade: fetch, derive, indicator and forecast in one call

use crate::cache::{CacheKey, NoCache, SeriesCache, TtlSeriesCache};
use crate::config::PipelineConfig;
use crate::error::{DerivationError, SourceError};
use crate::indicator::IndicatorSeries;
use crate::instrument::Instrument;
use crate::normalizer::derive;
use crate::source::{fetch_with_retry, FetchWindow, QuoteSource};
use forecast_rate::data::QuoteSeries;
use forecast_rate::models::{AdditiveTrendModel, ForecastModel};
use forecast_rate::{ForecastError, ForecastResult, Forecaster};
use rate_math::{MathError, DEFAULT_RSI_PERIOD};
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Overall outcome of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Ok,
    /// Fewer than two points were derived
    InsufficientData,
    SourceUnavailable,
    DerivationImpossible,
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PipelineStatus::Ok => "ok",
            PipelineStatus::InsufficientData => "insufficient data",
            PipelineStatus::SourceUnavailable => "source unavailable",
            PipelineStatus::DerivationImpossible => "derivation impossible",
        };
        f.write_str(label)
    }
}

/// What happened to the forecast of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ForecastOutcome {
    NotRequested,
    Ready(ForecastResult),
    InsufficientHistory { required: usize, actual: usize },
    Unavailable { reason: String },
}

impl ForecastOutcome {
    pub fn result(&self) -> Option<&ForecastResult> {
        match self {
            ForecastOutcome::Ready(result) => Some(result),
            _ => None,
        }
    }
}

/// Direction of the close over the fetched period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Rising,
    Falling,
    Flat,
}

impl TrendDirection {
    pub fn from_change(pct: f64) -> Self {
        if pct > 0.0 {
            TrendDirection::Rising
        } else if pct < 0.0 {
            TrendDirection::Falling
        } else {
            TrendDirection::Flat
        }
    }
}

/// Everything one run produced for an instrument
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResult {
    pub instrument: Instrument,
    pub status: PipelineStatus,
    /// Derived base-currency series; empty when the run failed
    pub series: QuoteSeries,
    pub latest_price: Option<f64>,
    /// Change between the two most recent closes, in percent
    pub price_change_pct: Option<f64>,
    /// Change between the first and last close, in percent
    pub period_change_pct: Option<f64>,
    pub trend: Option<TrendDirection>,
    pub indicator: Option<IndicatorSeries>,
    pub forecast: ForecastOutcome,
    /// Why the run did not reach `Ok`
    pub message: Option<String>,
}

impl PipelineResult {
    fn failed(instrument: &Instrument, status: PipelineStatus, message: String) -> Self {
        Self {
            instrument: instrument.clone(),
            status,
            series: QuoteSeries::empty(),
            latest_price: None,
            price_change_pct: None,
            period_change_pct: None,
            trend: None,
            indicator: None,
            forecast: ForecastOutcome::NotRequested,
            message: Some(message),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == PipelineStatus::Ok
    }
}

enum RunFailure {
    Source(SourceError),
    Derivation(DerivationError),
}

/// Runs instruments through fetch, derivation, RSI and forecasting.
///
/// The base series is fetched once per [`Pipeline::run`] and once per
/// [`Pipeline::run_batch`]. Source and derivation failures end a run with a
/// status; forecast failures only mark the forecast outcome.
#[derive(Debug, Clone)]
pub struct Pipeline<M: ForecastModel = AdditiveTrendModel> {
    source: Arc<dyn QuoteSource>,
    cache: Arc<dyn SeriesCache>,
    forecaster: Forecaster<M>,
    base_symbol: String,
    window: FetchWindow,
    rsi_period: usize,
}

impl Pipeline<AdditiveTrendModel> {
    /// A pipeline with default settings and no cache
    pub fn new(source: Arc<dyn QuoteSource>) -> Self {
        let defaults = PipelineConfig::default();
        Self {
            source,
            cache: Arc::new(NoCache),
            forecaster: Forecaster::new(AdditiveTrendModel::new()),
            base_symbol: defaults.base_symbol,
            window: defaults.window,
            rsi_period: DEFAULT_RSI_PERIOD,
        }
    }

    /// A pipeline set up from configuration, with a TTL cache
    pub fn from_config(config: &PipelineConfig, source: Arc<dyn QuoteSource>) -> Self {
        let mut forecaster = Forecaster::new(AdditiveTrendModel::new());
        if let Some(timeout) = config.forecast_timeout {
            forecaster = forecaster.with_timeout(timeout);
        }
        Self {
            source,
            cache: Arc::new(TtlSeriesCache::new(config.cache_ttl)),
            forecaster,
            base_symbol: config.base_symbol.clone(),
            window: config.window.clone(),
            rsi_period: config.rsi_period.max(1),
        }
    }
}

impl<M: ForecastModel> Pipeline<M> {
    pub fn with_cache(mut self, cache: Arc<dyn SeriesCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Swap the forecasting backend
    pub fn with_forecaster<N: ForecastModel>(self, forecaster: Forecaster<N>) -> Pipeline<N> {
        Pipeline {
            source: self.source,
            cache: self.cache,
            forecaster,
            base_symbol: self.base_symbol,
            window: self.window,
            rsi_period: self.rsi_period,
        }
    }

    pub fn with_base_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.base_symbol = symbol.into();
        self
    }

    pub fn with_window(mut self, window: FetchWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_rsi_period(mut self, period: usize) -> rate_math::Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "RSI period must be greater than zero".to_string(),
            ));
        }
        self.rsi_period = period;
        Ok(self)
    }

    pub fn base_symbol(&self) -> &str {
        &self.base_symbol
    }

    pub fn window(&self) -> &FetchWindow {
        &self.window
    }

    pub fn rsi_period(&self) -> usize {
        self.rsi_period
    }

    /// Run one instrument.
    ///
    /// The base series is resolved first, from the cache or the source, so a
    /// missing base fails the run even when the derived series is cached.
    /// A forecast is attempted when `horizon > 0`.
    pub fn run(&self, instrument: &Instrument, horizon: usize, want_indicator: bool) -> PipelineResult {
        info!(instrument = instrument.name(), horizon, "pipeline run");

        let derived = self
            .fetch_raw(&self.base_symbol)
            .map_err(RunFailure::Source)
            .and_then(|base| match self.cached_derived(instrument) {
                Some(series) => Ok(series),
                None => self.derive_with_base(instrument, &base),
            });

        self.finish(instrument, derived, horizon, want_indicator)
    }

    /// Fetch the underlying series of `instrument` without deriving it
    pub fn fetch_native(&self, instrument: &Instrument) -> Result<QuoteSeries, SourceError> {
        self.fetch_raw(instrument.symbol())
    }

    /// Derive the base-currency series of `instrument` without analysing it
    pub fn derive_series(&self, instrument: &Instrument) -> PipelineResult {
        self.run(instrument, 0, false)
    }

    fn cached_derived(&self, instrument: &Instrument) -> Option<QuoteSeries> {
        let key = self.derived_key(instrument);
        let hit = self.cache.get(&key)?;
        debug!(
            instrument = instrument.name(),
            fetched_at = %hit.fetched_at,
            "derived series cache hit"
        );
        Some(hit.series)
    }

    fn fetch_raw(&self, symbol: &str) -> Result<QuoteSeries, SourceError> {
        let key = CacheKey::raw(symbol, &self.window);
        if let Some(hit) = self.cache.get(&key) {
            debug!(symbol, fetched_at = %hit.fetched_at, "series cache hit");
            return Ok(hit.series);
        }

        let series = fetch_with_retry(self.source.as_ref(), symbol, &self.window)?;
        self.cache.put(key, series.clone());
        Ok(series)
    }

    fn derive_with_base(
        &self,
        instrument: &Instrument,
        base: &QuoteSeries,
    ) -> Result<QuoteSeries, RunFailure> {
        if base.is_empty() {
            return Err(RunFailure::Derivation(DerivationError::EmptyBase));
        }

        // The base instrument itself needs no second fetch
        let fetched;
        let target = if instrument.symbol() == self.base_symbol {
            base
        } else {
            fetched = self
                .fetch_raw(instrument.symbol())
                .map_err(RunFailure::Source)?;
            &fetched
        };

        let series = derive(instrument, base, Some(target)).map_err(RunFailure::Derivation)?;
        self.cache.put(self.derived_key(instrument), series.clone());
        Ok(series)
    }

    fn derived_key(&self, instrument: &Instrument) -> CacheKey {
        CacheKey::derived(
            instrument.symbol(),
            instrument.mode(),
            self.base_symbol.as_str(),
            &self.window,
        )
    }

    fn finish(
        &self,
        instrument: &Instrument,
        derived: Result<QuoteSeries, RunFailure>,
        horizon: usize,
        want_indicator: bool,
    ) -> PipelineResult {
        let series = match derived {
            Ok(series) => series,
            Err(RunFailure::Source(err)) => {
                warn!(instrument = instrument.name(), error = %err, "source unavailable");
                return PipelineResult::failed(
                    instrument,
                    PipelineStatus::SourceUnavailable,
                    err.to_string(),
                );
            }
            Err(RunFailure::Derivation(err)) => {
                warn!(instrument = instrument.name(), error = %err, "derivation impossible");
                return PipelineResult::failed(
                    instrument,
                    PipelineStatus::DerivationImpossible,
                    err.to_string(),
                );
            }
        };

        let latest_price = series.latest_close();
        if series.len() < 2 {
            warn!(
                instrument = instrument.name(),
                points = series.len(),
                "insufficient data"
            );
            let forecast = if horizon > 0 {
                ForecastOutcome::InsufficientHistory {
                    required: self.forecaster.min_history(),
                    actual: series.len(),
                }
            } else {
                ForecastOutcome::NotRequested
            };
            return PipelineResult {
                instrument: instrument.clone(),
                status: PipelineStatus::InsufficientData,
                message: Some(format!("Only {} point(s) available", series.len())),
                series,
                latest_price,
                price_change_pct: None,
                period_change_pct: None,
                trend: None,
                indicator: None,
                forecast,
            };
        }

        let price_change_pct = series.price_change_pct();
        let period_change_pct = period_change_pct(&series);
        let trend = period_change_pct.map(TrendDirection::from_change);

        let indicator = if want_indicator {
            match IndicatorSeries::rsi(&series, self.rsi_period) {
                Ok(indicator) => Some(indicator),
                Err(err) => {
                    warn!(instrument = instrument.name(), error = %err, "indicator failed");
                    None
                }
            }
        } else {
            None
        };

        let forecast = if horizon > 0 {
            self.forecast(instrument, &series, horizon)
        } else {
            ForecastOutcome::NotRequested
        };

        PipelineResult {
            instrument: instrument.clone(),
            status: PipelineStatus::Ok,
            series,
            latest_price,
            price_change_pct,
            period_change_pct,
            trend,
            indicator,
            forecast,
            message: None,
        }
    }

    fn forecast(
        &self,
        instrument: &Instrument,
        series: &QuoteSeries,
        horizon: usize,
    ) -> ForecastOutcome {
        match self.forecaster.forecast(series, horizon) {
            Ok(result) => ForecastOutcome::Ready(result),
            Err(ForecastError::InsufficientHistory { required, actual }) => {
                ForecastOutcome::InsufficientHistory { required, actual }
            }
            Err(err) => {
                warn!(instrument = instrument.name(), error = %err, "forecast unavailable");
                ForecastOutcome::Unavailable {
                    reason: err.to_string(),
                }
            }
        }
    }
}

impl<M: ForecastModel + Sync> Pipeline<M> {
    /// Run several instruments against a single base fetch.
    ///
    /// Instruments are processed in parallel; results keep the input order.
    pub fn run_batch(
        &self,
        instruments: &[Instrument],
        horizon: usize,
        want_indicator: bool,
    ) -> Vec<PipelineResult> {
        info!(count = instruments.len(), horizon, "pipeline batch");

        let base = self.fetch_raw(&self.base_symbol);
        if let Err(err) = &base {
            warn!(symbol = %self.base_symbol, error = %err, "base series unavailable");
        }

        instruments
            .par_iter()
            .map(|instrument| {
                let derived = match &base {
                    Ok(base) => match self.cached_derived(instrument) {
                        Some(series) => Ok(series),
                        None => self.derive_with_base(instrument, base),
                    },
                    Err(err) => Err(RunFailure::Source(SourceError::unavailable(
                        self.base_symbol.clone(),
                        err.to_string(),
                    ))),
                };
                self.finish(instrument, derived, horizon, want_indicator)
            })
            .collect()
    }
}

/// Percentage change from the first to the last close
pub fn period_change_pct(series: &QuoteSeries) -> Option<f64> {
    let first = series.first()?.close;
    let last = series.last()?.close;
    let pct = (last - first) / first * 100.0;
    pct.is_finite().then_some(pct)
}
