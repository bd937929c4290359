//! Valuation of instrument holdings in the base currency

use crate::error::PortfolioError;
use crate::pipeline::PipelineResult;
use serde::Serialize;
use std::collections::HashMap;
use std::str::FromStr;

/// A quantity of one instrument, by catalog name
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Holding {
    pub instrument: String,
    pub quantity: f64,
}

impl Holding {
    pub fn new(instrument: impl Into<String>, quantity: f64) -> Result<Self, PortfolioError> {
        let instrument = instrument.into();
        if !quantity.is_finite() || quantity <= 0.0 {
            return Err(PortfolioError::InvalidQuantity {
                name: instrument,
                quantity,
            });
        }
        Ok(Self {
            instrument,
            quantity,
        })
    }
}

/// Parses `NAME=QUANTITY`; the name may itself contain `=`
impl FromStr for Holding {
    type Err = PortfolioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, quantity) = s
            .rsplit_once('=')
            .ok_or_else(|| PortfolioError::InvalidHolding(s.to_string()))?;
        let quantity: f64 = quantity
            .trim()
            .parse()
            .map_err(|_| PortfolioError::InvalidHolding(s.to_string()))?;
        Holding::new(name.trim(), quantity)
    }
}

/// Valued line of a portfolio
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValuationLine {
    pub instrument: String,
    pub quantity: f64,
    /// `None` when no price was available
    pub price: Option<f64>,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Valuation {
    pub lines: Vec<ValuationLine>,
    /// Sum over priced lines only
    pub total: f64,
}

impl Valuation {
    /// Names of holdings that could not be priced
    pub fn unpriced(&self) -> Vec<&str> {
        self.lines
            .iter()
            .filter(|line| line.price.is_none())
            .map(|line| line.instrument.as_str())
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.lines.iter().all(|line| line.price.is_some())
    }
}

/// Holdings in insertion order; adding an instrument again adds to its quantity
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Portfolio {
    holdings: Vec<Holding>,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, holding: Holding) {
        match self
            .holdings
            .iter_mut()
            .find(|h| h.instrument == holding.instrument)
        {
            Some(existing) => existing.quantity += holding.quantity,
            None => self.holdings.push(holding),
        }
    }

    pub fn holdings(&self) -> &[Holding] {
        &self.holdings
    }

    pub fn is_empty(&self) -> bool {
        self.holdings.is_empty()
    }

    /// Value every holding at the given per-instrument prices
    pub fn value(&self, prices: &HashMap<String, f64>) -> Valuation {
        let lines: Vec<ValuationLine> = self
            .holdings
            .iter()
            .map(|holding| {
                let price = prices
                    .get(&holding.instrument)
                    .copied()
                    .filter(|p| p.is_finite() && *p > 0.0);
                ValuationLine {
                    instrument: holding.instrument.clone(),
                    quantity: holding.quantity,
                    price,
                    value: price.map(|p| p * holding.quantity),
                }
            })
            .collect();
        let total = lines.iter().filter_map(|line| line.value).sum();

        Valuation { lines, total }
    }

    /// Value holdings at the latest prices of pipeline results
    pub fn value_with(&self, results: &[PipelineResult]) -> Valuation {
        let prices: HashMap<String, f64> = results
            .iter()
            .filter_map(|r| Some((r.instrument.name().to_string(), r.latest_price?)))
            .collect();
        self.value(&prices)
    }
}

impl FromIterator<Holding> for Portfolio {
    fn from_iter<I: IntoIterator<Item = Holding>>(iter: I) -> Self {
        let mut portfolio = Portfolio::new();
        for holding in iter {
            portfolio.add(holding);
        }
        portfolio
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_unpriced_lines_are_not_zero() {
        let portfolio: Portfolio = vec![
            Holding::new("USD/TRY", 100.0).unwrap(),
            Holding::new("Gram Gold", 2.0).unwrap(),
        ]
        .into_iter()
        .collect();
        let prices = HashMap::from([("USD/TRY".to_string(), 32.5)]);

        let valuation = portfolio.value(&prices);
        assert_relative_eq!(valuation.total, 3250.0);
        assert_eq!(valuation.lines[1].price, None);
        assert_eq!(valuation.lines[1].value, None);
        assert_eq!(valuation.unpriced(), vec!["Gram Gold"]);
        assert!(!valuation.is_complete());
    }

    #[test]
    fn test_adding_same_instrument_accumulates() {
        let mut portfolio = Portfolio::new();
        portfolio.add(Holding::new("EUR/TRY", 10.0).unwrap());
        portfolio.add(Holding::new("EUR/TRY", 5.0).unwrap());

        assert_eq!(portfolio.holdings(), &[Holding::new("EUR/TRY", 15.0).unwrap()]);
    }

    #[rstest]
    #[case("USD/TRY=100", Some(("USD/TRY", 100.0)))]
    #[case(" Gram Gold = 2.5 ", Some(("Gram Gold", 2.5)))]
    #[case("USD/TRY", None)]
    #[case("USD/TRY=lots", None)]
    #[case("USD/TRY=-3", None)]
    fn test_parse_holding(#[case] input: &str, #[case] expected: Option<(&str, f64)>) {
        let parsed = input.parse::<Holding>().ok();
        let expected = expected.map(|(name, qty)| Holding::new(name, qty).unwrap());
        assert_eq!(parsed, expected);
    }
}
