//! Derivation of base-currency series from an instrument's native quotes

use crate::error::DerivationError;
use crate::instrument::{Instrument, PricingMode, GRAMS_PER_TROY_OUNCE};
use forecast_rate::data::{Bar, QuoteSeries};
use tracing::debug;

/// Convert `target` into a base-currency series according to the
/// instrument's pricing mode.
///
/// Every mode except `Direct` aligns on the dates both series carry and
/// applies its formula to open and close separately. High and low take the
/// formula's extremes, so for `Calc` the target's low produces the derived
/// high. Rows with a non-finite or non-positive result are dropped. The
/// function is pure.
pub fn derive(
    instrument: &Instrument,
    base: &QuoteSeries,
    target: Option<&QuoteSeries>,
) -> Result<QuoteSeries, DerivationError> {
    if base.is_empty() {
        return Err(DerivationError::EmptyBase);
    }
    let target =
        target.ok_or_else(|| DerivationError::MissingTarget(instrument.symbol().to_string()))?;

    let (formula, extremes): (fn(f64, f64) -> f64, Extremes) = match instrument.mode() {
        PricingMode::Direct => {
            return if target.is_empty() {
                Err(DerivationError::NoValidRows)
            } else {
                Ok(target.clone())
            };
        }
        PricingMode::GoldCalc | PricingMode::SilverCalc => (
            |base, target| (target * base) / GRAMS_PER_TROY_OUNCE,
            Extremes::Aligned,
        ),
        PricingMode::Calc => (|base, target| base / target, Extremes::Crossed),
        // Both modes multiply; kept as separate modes for catalog compatibility
        PricingMode::CalcInverse | PricingMode::CalcMultiply => {
            (|base, target| base * target, Extremes::Aligned)
        }
    };

    let mut overlap = 0usize;
    let mut rows: Vec<Bar> = Vec::with_capacity(target.len().min(base.len()));
    for base_bar in base.bars() {
        let Some(target_bar) = target.get(base_bar.date) else {
            continue;
        };
        overlap += 1;
        let row = combine(base_bar, target_bar, formula, extremes);
        if row.is_valid() {
            rows.push(row);
        }
    }

    if overlap == 0 {
        return Err(DerivationError::NoOverlap);
    }
    if rows.is_empty() {
        return Err(DerivationError::NoValidRows);
    }

    debug!(
        instrument = instrument.name(),
        mode = %instrument.mode(),
        overlap,
        kept = rows.len(),
        "derived series"
    );
    Ok(QuoteSeries::from_bars(rows))
}

/// How the target's high and low map onto the derived bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extremes {
    /// Formula increases with the target: high pairs with high
    Aligned,
    /// Formula decreases with the target: high pairs with low
    Crossed,
}

fn combine(base: &Bar, target: &Bar, formula: fn(f64, f64) -> f64, extremes: Extremes) -> Bar {
    let (target_high, target_low) = match extremes {
        Extremes::Aligned => (target.high, target.low),
        Extremes::Crossed => (target.low, target.high),
    };
    let bar = Bar::new(
        base.date,
        formula(base.open, target.open),
        formula(base.high, target_high),
        formula(base.low, target_low),
        formula(base.close, target.close),
    );
    if !bar.is_valid() {
        return bar;
    }

    // Source bars with open or close outside their own range still yield
    // low <= open, close <= high
    Bar {
        high: bar.high.max(bar.open).max(bar.close),
        low: bar.low.min(bar.open).min(bar.close),
        ..bar
    }
}
