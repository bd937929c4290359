//! Oscillator indicator implementations
//!
//! Contains the Relative Strength Index (RSI) computed from simple rolling
//! means of gains and losses, plus the zone labels used to read it.

use crate::moving_averages::SimpleMovingAverage;
use crate::{MathError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Look-back used when callers do not pick one
pub const DEFAULT_RSI_PERIOD: usize = 14;

/// Readings strictly above this are overbought
pub const OVERBOUGHT_THRESHOLD: f64 = 70.0;

/// Readings strictly below this are oversold
pub const OVERSOLD_THRESHOLD: f64 = 30.0;

/// Relative Strength Index (RSI) implementation
#[derive(Debug, Clone)]
pub struct RelativeStrengthIndex {
    period: usize,
    previous_price: Option<f64>,
    gains: SimpleMovingAverage,
    losses: SimpleMovingAverage,
}

impl RelativeStrengthIndex {
    /// Create a new RSI with the specified period
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            period,
            previous_price: None,
            gains: SimpleMovingAverage::new(period)?,
            losses: SimpleMovingAverage::new(period)?,
        })
    }

    /// Update the RSI with a new price value
    pub fn update(&mut self, price: f64) -> Result<()> {
        if !price.is_finite() {
            return Err(MathError::InvalidInput(format!(
                "RSI input must be finite, got {}",
                price
            )));
        }

        if let Some(prev_price) = self.previous_price {
            let change = price - prev_price;

            let gain = if change > 0.0 { change } else { 0.0 };
            let loss = if change < 0.0 { -change } else { 0.0 };

            self.gains.update(gain)?;
            self.losses.update(loss)?;
        }

        self.previous_price = Some(price);

        Ok(())
    }

    /// Whether `period` price changes have been observed
    pub fn is_ready(&self) -> bool {
        self.gains.is_ready()
    }

    /// Get the current RSI value (0-100)
    pub fn value(&self) -> Result<f64> {
        if !self.is_ready() {
            return Err(MathError::InsufficientData(format!(
                "Not enough data for RSI calculation. Need {} values.",
                self.period + 1
            )));
        }

        let avg_gain = self.gains.value()?;
        let avg_loss = self.losses.value()?;

        // No losses in the window: RS is unbounded
        if avg_loss == 0.0 {
            return Ok(100.0);
        }

        let rs = avg_gain / avg_loss;
        let rsi = 100.0 - (100.0 / (1.0 + rs));

        if !rsi.is_finite() {
            return Err(MathError::CalculationError(format!(
                "RSI is not finite (avg_gain={}, avg_loss={})",
                avg_gain, avg_loss
            )));
        }

        Ok(rsi.clamp(0.0, 100.0))
    }

    /// Get the current period
    pub fn period(&self) -> usize {
        self.period
    }

    /// Reset the RSI, clearing all values
    pub fn reset(&mut self) {
        self.previous_price = None;
        self.gains.reset();
        self.losses.reset();
    }
}

/// RSI over a whole close series.
///
/// The output has one entry per input price. The first `period` entries are
/// `None` because their window of price changes is incomplete.
pub fn rsi_series(closes: &[f64], period: usize) -> Result<Vec<Option<f64>>> {
    let mut rsi = RelativeStrengthIndex::new(period)?;
    let mut out = Vec::with_capacity(closes.len());

    for &close in closes {
        rsi.update(close)?;
        out.push(if rsi.is_ready() { Some(rsi.value()?) } else { None });
    }

    Ok(out)
}

/// Reading of an RSI value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsiZone {
    Overbought,
    Oversold,
    Neutral,
}

impl RsiZone {
    /// Classify a value: `> 70` overbought, `< 30` oversold, otherwise neutral
    pub fn classify(value: f64) -> Self {
        if value > OVERBOUGHT_THRESHOLD {
            RsiZone::Overbought
        } else if value < OVERSOLD_THRESHOLD {
            RsiZone::Oversold
        } else {
            RsiZone::Neutral
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RsiZone::Overbought => "overbought",
            RsiZone::Oversold => "oversold",
            RsiZone::Neutral => "neutral",
        }
    }
}

impl fmt::Display for RsiZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
