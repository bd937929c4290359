//! Additive trend + seasonality model
//!
//! `y(t) = trend(t) + Σ seasonal(t) + ε`, where the trend is piecewise linear
//! with automatically placed changepoints and each seasonality is a truncated
//! Fourier series. Coefficients are fit by penalized least squares on scaled
//! data: time scaled to `[0, 1]` over the history, values scaled by their
//! maximum magnitude.
//!
//! The uncertainty band is simulated. Each sample draws future trend-rate
//! changes (Laplace magnitudes, occurring at the historical changepoint rate)
//! plus Gaussian observation noise. Samples are antithetic, so the band always
//! contains the point forecast.

use super::least_squares::solve_ridge;
use super::{ForecastModel, ForecastPoint, TrainedForecastModel};
use crate::data::{days_since_epoch, frame_points};
use crate::error::{ForecastError, Result};
use chrono::NaiveDate;
use ndarray::{s, Array1, Array2};
use polars::prelude::DataFrame;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp, Normal};
use statrs::statistics::{Data, OrderStatistics};
use std::f64::consts::PI;
use tracing::debug;

/// Prior scales are relative to this nominal noise level on scaled data
const NOISE_SCALE: f64 = 0.05;
/// Keeps the normal equations well posed for unpenalized columns
const RIDGE_FLOOR: f64 = 1e-9;
/// The trend needs two points to have a slope
const MIN_TRAINING_POINTS: usize = 2;

/// A periodic component expressed as a Fourier series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seasonality {
    pub name: &'static str,
    /// Period in days
    pub period: f64,
    /// Number of sine/cosine pairs
    pub order: usize,
}

pub const DAILY: Seasonality = Seasonality {
    name: "daily",
    period: 1.0,
    order: 4,
};

pub const WEEKLY: Seasonality = Seasonality {
    name: "weekly",
    period: 7.0,
    order: 3,
};

pub const YEARLY: Seasonality = Seasonality {
    name: "yearly",
    period: 365.25,
    order: 10,
};

#[derive(Debug, Clone, Copy, PartialEq)]
struct FourierTerm {
    period: f64,
    harmonic: usize,
    sine: bool,
}

impl FourierTerm {
    fn value(&self, day: f64) -> f64 {
        let phase = 2.0 * PI * self.harmonic as f64 * (day / self.period).fract();
        if self.sine {
            phase.sin()
        } else {
            phase.cos()
        }
    }
}

/// Additive trend/seasonality forecasting model
#[derive(Debug, Clone)]
pub struct AdditiveTrendModel {
    name: String,
    n_changepoints: usize,
    changepoint_range: f64,
    changepoint_prior_scale: f64,
    seasonality_prior_scale: f64,
    daily_seasonality: bool,
    weekly_seasonality: Option<bool>,
    yearly_seasonality: Option<bool>,
    interval_width: f64,
    uncertainty_samples: usize,
    seed: u64,
}

impl Default for AdditiveTrendModel {
    fn default() -> Self {
        Self {
            name: "Additive trend/seasonality".to_string(),
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            daily_seasonality: true,
            weekly_seasonality: None,
            yearly_seasonality: None,
            interval_width: 0.8,
            uncertainty_samples: 1000,
            seed: 0x5eed,
        }
    }
}

impl AdditiveTrendModel {
    /// Create a model with daily seasonality enabled and an 80% interval
    pub fn new() -> Self {
        Self::default()
    }

    /// Width of the uncertainty interval, strictly between 0 and 1
    pub fn with_interval_width(mut self, width: f64) -> Result<Self> {
        if !(width > 0.0 && width < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "Interval width must be between 0 and 1, got {}",
                width
            )));
        }
        self.interval_width = width;
        Ok(self)
    }

    /// Maximum number of potential trend changepoints
    pub fn with_changepoints(mut self, n_changepoints: usize) -> Self {
        self.n_changepoints = n_changepoints;
        self
    }

    /// Flexibility of the trend; larger values allow sharper rate changes
    pub fn with_changepoint_prior_scale(mut self, scale: f64) -> Result<Self> {
        if !(scale > 0.0 && scale.is_finite()) {
            return Err(ForecastError::InvalidParameter(format!(
                "Changepoint prior scale must be positive, got {}",
                scale
            )));
        }
        self.changepoint_prior_scale = scale;
        Ok(self)
    }

    pub fn with_daily_seasonality(mut self, enabled: bool) -> Self {
        self.daily_seasonality = enabled;
        self
    }

    /// Force weekly seasonality on or off instead of deciding from the history span
    pub fn with_weekly_seasonality(mut self, enabled: bool) -> Self {
        self.weekly_seasonality = Some(enabled);
        self
    }

    /// Force yearly seasonality on or off instead of deciding from the history span
    pub fn with_yearly_seasonality(mut self, enabled: bool) -> Self {
        self.yearly_seasonality = Some(enabled);
        self
    }

    /// Number of simulated paths behind the interval; fewer than 2 gives a zero-width band
    pub fn with_uncertainty_samples(mut self, samples: usize) -> Self {
        self.uncertainty_samples = samples;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn interval_width(&self) -> f64 {
        self.interval_width
    }

    fn seasonalities(&self, span_days: f64) -> Vec<Seasonality> {
        let mut out = Vec::new();
        if self.daily_seasonality {
            out.push(DAILY);
        }
        if self.weekly_seasonality.unwrap_or(span_days >= 14.0) {
            out.push(WEEKLY);
        }
        if self.yearly_seasonality.unwrap_or(span_days >= 730.0) {
            out.push(YEARLY);
        }
        out
    }

    fn changepoints(&self, t: &[f64]) -> Vec<f64> {
        let hist = ((t.len() as f64) * self.changepoint_range).floor() as usize;
        let k = self.n_changepoints.min(hist.saturating_sub(1));
        let mut changepoints: Vec<f64> = Vec::with_capacity(k);

        for j in 1..=k {
            let idx = ((j * (hist - 1)) as f64 / k as f64).round() as usize;
            let cp = t[idx];
            if cp < 1.0 && changepoints.last().map_or(true, |&last| cp > last) {
                changepoints.push(cp);
            }
        }

        changepoints
    }
}

impl ForecastModel for AdditiveTrendModel {
    type Trained = TrainedAdditiveTrend;

    fn train(&self, frame: &DataFrame) -> Result<Self::Trained> {
        let points = frame_points(frame)?;
        let n = points.len();
        if n < MIN_TRAINING_POINTS {
            return Err(ForecastError::InsufficientHistory {
                required: MIN_TRAINING_POINTS,
                actual: n,
            });
        }
        if points.windows(2).any(|w| w[0].0 >= w[1].0) {
            return Err(ForecastError::DataError(
                "Model frame dates must be strictly ascending".to_string(),
            ));
        }

        let days: Vec<f64> = points
            .iter()
            .map(|(date, _)| days_since_epoch(*date) as f64)
            .collect();
        let first_day = days[0];
        let last_day = days[n - 1];
        let span_days = last_day - first_day;

        let y_scale = points.iter().map(|(_, v)| v.abs()).fold(0.0, f64::max);
        if y_scale == 0.0 {
            return Err(ForecastError::DataError(
                "Cannot scale a series of zeros".to_string(),
            ));
        }

        let t: Vec<f64> = days.iter().map(|d| (d - first_day) / span_days).collect();
        let ys: Vec<f64> = points.iter().map(|(_, v)| v / y_scale).collect();

        let changepoints = self.changepoints(&t);

        // Constant columns are absorbed by the intercept
        let mut terms = Vec::new();
        for seasonality in self.seasonalities(span_days) {
            for harmonic in 1..=seasonality.order {
                for sine in [true, false] {
                    let term = FourierTerm {
                        period: seasonality.period,
                        harmonic,
                        sine,
                    };
                    let first = term.value(days[0]);
                    if days.iter().any(|&d| (term.value(d) - first).abs() > 1e-9) {
                        terms.push(term);
                    }
                }
            }
        }

        let mut trained = TrainedAdditiveTrend {
            name: self.name.clone(),
            first_day,
            last_day,
            span_days,
            y_scale,
            beta: Array1::zeros(0),
            changepoints,
            terms,
            sigma: 0.0,
            changepoint_rate: 0.0,
            delta_scale: 0.0,
            interval_width: self.interval_width,
            uncertainty_samples: self.uncertainty_samples,
            seed: self.seed,
        };

        let k = trained.changepoints.len();
        let width = trained.width();
        let mut design = Array2::zeros((n, width));
        for (i, (&ti, &day)) in t.iter().zip(&days).enumerate() {
            design.row_mut(i).assign(&trained.design_row(ti, day));
        }
        let ys = Array1::from(ys);

        let changepoint_penalty = (NOISE_SCALE / self.changepoint_prior_scale).powi(2) + RIDGE_FLOOR;
        let seasonal_penalty = (NOISE_SCALE / self.seasonality_prior_scale).powi(2) + RIDGE_FLOOR;
        let penalty = Array1::from_shape_fn(width, |j| match j {
            0 | 1 => RIDGE_FLOOR,
            j if j < 2 + k => changepoint_penalty,
            _ => seasonal_penalty,
        });

        let beta = solve_ridge(&design, &ys, &penalty)?;

        let residuals = &ys - &design.dot(&beta);
        let sse = residuals.mapv(|r| r * r).sum();
        let sigma = (sse / n as f64).sqrt() * y_scale;

        let mean_abs_delta = if k == 0 {
            0.0
        } else {
            beta.slice(s![2..2 + k]).mapv(f64::abs).sum() / k as f64
        };

        trained.beta = beta;
        trained.sigma = sigma;
        trained.changepoint_rate = (k as f64 / span_days).min(1.0);
        trained.delta_scale = mean_abs_delta * y_scale / span_days;

        debug!(
            points = n,
            changepoints = k,
            seasonal_terms = trained.terms.len(),
            sigma,
            "fitted additive trend model"
        );

        Ok(trained)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Fitted additive trend/seasonality model
#[derive(Debug, Clone)]
pub struct TrainedAdditiveTrend {
    name: String,
    first_day: f64,
    last_day: f64,
    span_days: f64,
    y_scale: f64,
    beta: Array1<f64>,
    changepoints: Vec<f64>,
    terms: Vec<FourierTerm>,
    /// Residual standard deviation in price units
    sigma: f64,
    /// Probability of a trend change on any future day
    changepoint_rate: f64,
    /// Laplace scale of a trend change, in price per day per day
    delta_scale: f64,
    interval_width: f64,
    uncertainty_samples: usize,
    seed: u64,
}

impl TrainedAdditiveTrend {
    /// Intercept, slope, one column per changepoint, one per Fourier term
    fn width(&self) -> usize {
        2 + self.changepoints.len() + self.terms.len()
    }

    fn design_row(&self, t: f64, day: f64) -> Array1<f64> {
        let mut row = Vec::with_capacity(self.width());
        row.push(1.0);
        row.push(t);
        row.extend(self.changepoints.iter().map(|&cp| (t - cp).max(0.0)));
        row.extend(self.terms.iter().map(|term| term.value(day)));
        Array1::from(row)
    }

    fn point_estimate(&self, day: f64) -> f64 {
        let t = (day - self.first_day) / self.span_days;
        self.design_row(t, day).dot(&self.beta) * self.y_scale
    }

    /// Residual standard deviation of the fit, in price units
    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    /// Trend slope at the end of the history, in price units per day
    pub fn final_slope_per_day(&self) -> f64 {
        let k = self.changepoints.len();
        let scaled_slope = self.beta[1] + self.beta.slice(s![2..2 + k]).sum();
        scaled_slope * self.y_scale / self.span_days
    }

    /// Simulated deviations from the point forecast, one sample set per horizon
    fn simulate_deviations(&self, horizons: &[usize]) -> Result<Vec<Vec<f64>>> {
        let pairs = self.uncertainty_samples / 2;
        let max_h = horizons.iter().copied().max().unwrap_or(0);
        let mut per_horizon: Vec<Vec<f64>> = vec![Vec::with_capacity(pairs * 2); horizons.len()];

        let noise = if self.sigma > 0.0 {
            Some(Normal::new(0.0, self.sigma).map_err(|e| {
                ForecastError::ForecastUnavailable(format!("Invalid noise distribution: {}", e))
            })?)
        } else {
            None
        };
        let trend_change = if self.delta_scale > 0.0 && self.changepoint_rate > 0.0 {
            Some(Exp::new(1.0 / self.delta_scale).map_err(|e| {
                ForecastError::ForecastUnavailable(format!("Invalid trend distribution: {}", e))
            })?)
        } else {
            None
        };

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut level_path = vec![0.0; max_h + 1];

        for _ in 0..pairs {
            let mut slope = 0.0;
            let mut level = 0.0;
            for h in 1..=max_h {
                if let Some(exp) = &trend_change {
                    if rng.gen::<f64>() < self.changepoint_rate {
                        // Difference of two exponentials is Laplace
                        slope += exp.sample(&mut rng) - exp.sample(&mut rng);
                    }
                }
                level += slope;
                level_path[h] = level;
            }

            for (samples, &h) in per_horizon.iter_mut().zip(horizons) {
                let eps = noise.as_ref().map_or(0.0, |dist| dist.sample(&mut rng));
                let deviation = level_path[h] + eps;
                samples.push(deviation);
                samples.push(-deviation);
            }
        }

        Ok(per_horizon)
    }
}

impl TrainedForecastModel for TrainedAdditiveTrend {
    fn predict(&self, dates: &[NaiveDate]) -> Result<Vec<ForecastPoint>> {
        let days: Vec<f64> = dates
            .iter()
            .map(|date| days_since_epoch(*date) as f64)
            .collect();

        let yhat: Vec<f64> = days.iter().map(|&day| self.point_estimate(day)).collect();
        if yhat.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::ForecastUnavailable(
                "Point forecast is not finite".to_string(),
            ));
        }

        let horizons: Vec<usize> = days
            .iter()
            .map(|&day| (day - self.last_day).max(0.0) as usize)
            .collect();
        let deviations = self.simulate_deviations(&horizons)?;

        let lower_q = (1.0 - self.interval_width) / 2.0;
        let upper_q = (1.0 + self.interval_width) / 2.0;

        let mut points = Vec::with_capacity(dates.len());
        for ((date, yhat), samples) in dates.iter().zip(yhat).zip(deviations) {
            let (lower, upper) = if samples.is_empty() {
                (0.0, 0.0)
            } else {
                let mut data = Data::new(samples);
                (data.quantile(lower_q), data.quantile(upper_q))
            };
            if !(lower.is_finite() && upper.is_finite()) {
                return Err(ForecastError::ForecastUnavailable(
                    "Uncertainty interval is not finite".to_string(),
                ));
            }
            points.push(ForecastPoint {
                date: *date,
                yhat,
                yhat_lower: yhat + lower,
                yhat_upper: yhat + upper,
            });
        }

        Ok(points)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
