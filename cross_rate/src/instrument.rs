//! Instruments and the ways they are priced in the base currency

use serde::{Deserialize, Serialize};
use std::fmt;

/// Grams in one troy ounce
pub const GRAMS_PER_TROY_OUNCE: f64 = 31.1035;

/// How an instrument's quotes turn into a base-currency series.
///
/// `base` is the base-currency rate series (e.g. USD in TRY) and `target`
/// the instrument's own quotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingMode {
    /// The target is already quoted in the base currency
    Direct,
    /// USD per troy ounce of gold, converted to base currency per gram
    GoldCalc,
    /// USD per troy ounce of silver, converted to base currency per gram
    SilverCalc,
    /// `base / target` for a target quoted as units per USD
    Calc,
    /// `base * target`
    CalcInverse,
    /// `base * target` for a target quoted as USD per unit
    CalcMultiply,
}

impl PricingMode {
    pub const ALL: [PricingMode; 6] = [
        PricingMode::Direct,
        PricingMode::GoldCalc,
        PricingMode::SilverCalc,
        PricingMode::Calc,
        PricingMode::CalcInverse,
        PricingMode::CalcMultiply,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            PricingMode::Direct => "direct",
            PricingMode::GoldCalc => "gold_calc",
            PricingMode::SilverCalc => "silver_calc",
            PricingMode::Calc => "calc",
            PricingMode::CalcInverse => "calc_inverse",
            PricingMode::CalcMultiply => "calc_multiply",
        }
    }
}

impl fmt::Display for PricingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A named, priceable instrument
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Instrument {
    name: String,
    symbol: String,
    mode: PricingMode,
}

impl Instrument {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>, mode: PricingMode) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            mode,
        }
    }

    /// Display name, unique within a catalog
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Symbol requested from the quote source
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn mode(&self) -> PricingMode {
        self.mode
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}, {})", self.name, self.symbol, self.mode)
    }
}
