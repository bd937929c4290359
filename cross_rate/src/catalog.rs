//! Instrument catalogs, built in or loaded from TOML
//!
//! ```toml
//! [[instrument]]
//! name = "USD/TRY"
//! symbol = "USDTRY=X"
//! mode = "direct"
//!
//! [[instrument]]
//! name = "Gram Gold"
//! symbol = "GC=F"
//! mode = "gold_calc"
//! ```

use crate::error::ConfigError;
use crate::instrument::{Instrument, PricingMode};
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Fixed, name-unique list of instruments in display order
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    instruments: Vec<Instrument>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(rename = "instrument", default)]
    instruments: Vec<Instrument>,
}

impl Catalog {
    /// Build a catalog, rejecting blank fields and duplicate names
    pub fn new(instruments: Vec<Instrument>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for instrument in &instruments {
            if instrument.name().trim().is_empty() || instrument.symbol().trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "Instrument name and symbol must not be blank: {}",
                    instrument
                )));
            }
            if !seen.insert(instrument.name()) {
                return Err(ConfigError::DuplicateInstrument(
                    instrument.name().to_string(),
                ));
            }
        }
        Ok(Self { instruments })
    }

    /// Instruments quoted against the Turkish lira, with `USDTRY=X` as base
    pub fn builtin() -> Self {
        use PricingMode::*;

        let instruments = [
            ("USD/TRY", "USDTRY=X", Direct),
            ("EUR/TRY", "EURTRY=X", Direct),
            ("GBP/TRY", "GBPTRY=X", Direct),
            ("Gram Gold", "GC=F", GoldCalc),
            ("Gram Silver", "SI=F", SilverCalc),
            ("JPY/TRY", "USDJPY=X", Calc),
            ("SAR/TRY", "USDSAR=X", Calc),
            ("KWD/TRY", "USDKWD=X", Calc),
            ("AZN/TRY", "USDAZN=X", Calc),
            ("CHF/TRY", "CHFUSD=X", CalcInverse),
            ("AUD/TRY", "AUDUSD=X", CalcMultiply),
        ]
        .into_iter()
        .map(|(name, symbol, mode)| Instrument::new(name, symbol, mode))
        .collect();

        Self { instruments }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let file: CatalogFile = toml::from_str(contents)?;
        if file.instruments.is_empty() {
            return Err(ConfigError::Invalid(
                "Catalog defines no instruments".to_string(),
            ));
        }
        Self::new(file.instruments)
    }

    /// Load a catalog from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn get(&self, name: &str) -> Option<&Instrument> {
        self.instruments.iter().find(|i| i.name() == name)
    }

    /// Like [`Catalog::get`], but a missing name is an error
    pub fn require(&self, name: &str) -> Result<&Instrument, ConfigError> {
        self.get(name)
            .ok_or_else(|| ConfigError::UnknownInstrument(name.to_string()))
    }

    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instrument> {
        self.instruments.iter()
    }

    pub fn len(&self) -> usize {
        self.instruments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instruments.is_empty()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}
