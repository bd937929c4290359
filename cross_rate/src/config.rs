//! Pipeline configuration parsing from environment variables.

use crate::cache::DEFAULT_TTL;
use crate::catalog::Catalog;
use crate::error::ConfigError;
use crate::source::FetchWindow;
use rate_math::DEFAULT_RSI_PERIOD;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_SYMBOL: &str = "USDTRY=X";
pub const DEFAULT_FORECAST_TIMEOUT: Duration = Duration::from_secs(30);

/// Pipeline environment configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Symbol of the base-currency rate every cross is derived from
    pub base_symbol: String,
    pub window: FetchWindow,
    pub rsi_period: usize,
    /// Zero disables caching
    pub cache_ttl: Duration,
    /// `None` lets forecast fits run to completion
    pub forecast_timeout: Option<Duration>,
    /// TOML catalog to use instead of the built-in one
    pub catalog_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            base_symbol: DEFAULT_BASE_SYMBOL.to_string(),
            window: FetchWindow::default(),
            rsi_period: DEFAULT_RSI_PERIOD,
            cache_ttl: DEFAULT_TTL,
            forecast_timeout: Some(DEFAULT_FORECAST_TIMEOUT),
            catalog_path: None,
        }
    }
}

impl PipelineConfig {
    /// Read `CROSS_RATE_*` variables, falling back to defaults for missing or
    /// unparseable values
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`PipelineConfig::from_env`] with an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let number = |key: &str| text(key).and_then(|v| v.parse::<u64>().ok());

        let forecast_timeout = match number("CROSS_RATE_FORECAST_TIMEOUT_SECS") {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => defaults.forecast_timeout,
        };

        Self {
            base_symbol: text("CROSS_RATE_BASE_SYMBOL").unwrap_or(defaults.base_symbol),
            window: FetchWindow::new(
                text("CROSS_RATE_PERIOD").unwrap_or(defaults.window.period),
                text("CROSS_RATE_INTERVAL").unwrap_or(defaults.window.interval),
            ),
            rsi_period: number("CROSS_RATE_RSI_PERIOD")
                .and_then(|p| usize::try_from(p).ok())
                .filter(|p| *p > 0)
                .unwrap_or(defaults.rsi_period),
            cache_ttl: number("CROSS_RATE_CACHE_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            forecast_timeout,
            catalog_path: text("CROSS_RATE_CATALOG").map(PathBuf::from),
        }
    }

    /// The configured TOML catalog, or the built-in one
    pub fn load_catalog(&self) -> Result<Catalog, ConfigError> {
        match &self.catalog_path {
            Some(path) => Catalog::load(path),
            None => Ok(Catalog::builtin()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> PipelineConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        PipelineConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_pipeline_config_defaults() {
        let config = config_from(&[]);
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.base_symbol, "USDTRY=X");
        assert_eq!(config.window, FetchWindow::new("1y", "1d"));
        assert_eq!(config.rsi_period, 14);
        assert_eq!(config.cache_ttl, Duration::from_secs(60));
        assert_eq!(config.forecast_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("CROSS_RATE_BASE_SYMBOL", "USDEUR=X"),
            ("CROSS_RATE_PERIOD", "5y"),
            ("CROSS_RATE_INTERVAL", "1wk"),
            ("CROSS_RATE_RSI_PERIOD", "9"),
            ("CROSS_RATE_CACHE_TTL_SECS", "0"),
            ("CROSS_RATE_FORECAST_TIMEOUT_SECS", "0"),
            ("CROSS_RATE_CATALOG", "/etc/cross-rate/catalog.toml"),
        ]);

        assert_eq!(config.base_symbol, "USDEUR=X");
        assert_eq!(config.window, FetchWindow::new("5y", "1wk"));
        assert_eq!(config.rsi_period, 9);
        assert_eq!(config.cache_ttl, Duration::ZERO);
        assert_eq!(config.forecast_timeout, None);
        assert_eq!(
            config.catalog_path,
            Some(PathBuf::from("/etc/cross-rate/catalog.toml"))
        );
    }

    #[test]
    fn test_unparseable_values_fall_back() {
        let config = config_from(&[
            ("CROSS_RATE_RSI_PERIOD", "fourteen"),
            ("CROSS_RATE_CACHE_TTL_SECS", "-5"),
            ("CROSS_RATE_BASE_SYMBOL", "   "),
        ]);
        assert_eq!(config, PipelineConfig::default());

        assert_eq!(config_from(&[("CROSS_RATE_RSI_PERIOD", "0")]).rsi_period, 14);
    }

    #[test]
    fn test_missing_catalog_file() {
        let config = config_from(&[("CROSS_RATE_CATALOG", "/nonexistent/catalog.toml")]);
        assert!(matches!(config.load_catalog(), Err(ConfigError::Io { .. })));
        assert_eq!(config_from(&[]).load_catalog().unwrap(), Catalog::builtin());
    }
}
