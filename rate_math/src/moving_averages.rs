//! Moving average calculation implementations
//!
//! Contains the streaming Simple Moving Average used by the oscillators.

use crate::{MathError, Result};
use std::collections::VecDeque;

/// Simple Moving Average (SMA) implementation
#[derive(Debug, Clone)]
pub struct SimpleMovingAverage {
    period: usize,
    values: VecDeque<f64>,
}

impl SimpleMovingAverage {
    /// Create a new Simple Moving Average with the specified period
    pub fn new(period: usize) -> Result<Self> {
        if period == 0 {
            return Err(MathError::InvalidInput(
                "Period must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            period,
            values: VecDeque::with_capacity(period),
        })
    }

    /// Update the SMA with a new value
    pub fn update(&mut self, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(MathError::InvalidInput(format!(
                "SMA input must be finite, got {}",
                value
            )));
        }

        self.values.push_back(value);

        // Remove oldest value if we have more than period values
        if self.values.len() > self.period {
            self.values.pop_front();
        }

        Ok(())
    }

    /// Whether a full window has been observed
    pub fn is_ready(&self) -> bool {
        self.values.len() == self.period
    }

    /// Get the current SMA value
    ///
    /// The window is summed on read, so a window of zeros yields exactly `0.0`.
    pub fn value(&self) -> Result<f64> {
        if !self.is_ready() {
            return Err(MathError::InsufficientData(format!(
                "Not enough data for SMA calculation. Need {} values, have {}.",
                self.period,
                self.values.len()
            )));
        }

        Ok(self.values.iter().sum::<f64>() / self.period as f64)
    }

    /// Get the current period
    pub fn period(&self) -> usize {
        self.period
    }

    /// Reset the SMA, clearing all values
    pub fn reset(&mut self) {
        self.values.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sma_calculation() {
        let mut sma = SimpleMovingAverage::new(3).unwrap();

        sma.update(10.0).unwrap();
        sma.update(11.0).unwrap();
        assert!(sma.value().is_err());

        sma.update(12.0).unwrap();
        assert_relative_eq!(sma.value().unwrap(), 11.0);

        sma.update(16.0).unwrap();
        assert_relative_eq!(sma.value().unwrap(), 13.0);
    }

    #[test]
    fn test_sma_rejects_zero_period() {
        assert!(matches!(
            SimpleMovingAverage::new(0),
            Err(MathError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_sma_rejects_non_finite_input() {
        let mut sma = SimpleMovingAverage::new(2).unwrap();
        assert!(sma.update(f64::NAN).is_err());
        assert!(sma.update(f64::INFINITY).is_err());
    }

    #[test]
    fn test_window_returning_to_zero_is_exact() {
        let mut sma = SimpleMovingAverage::new(2).unwrap();
        for value in [0.1, 0.2, 0.0, 0.0] {
            sma.update(value).unwrap();
        }
        assert_eq!(sma.value().unwrap(), 0.0);
    }

    #[test]
    fn test_reset_clears_window() {
        let mut sma = SimpleMovingAverage::new(1).unwrap();
        sma.update(5.0).unwrap();
        assert!(sma.is_ready());
        sma.reset();
        assert!(!sma.is_ready());
    }
}
