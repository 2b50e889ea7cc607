//! Environment-driven configuration.
//!
//! `.env` is loaded through dotenvy, then each sub-config reads its own
//! variables with defaults.

pub mod backtest_config;
pub mod betting_config;

pub use backtest_config::BacktestEnvConfig;
pub use betting_config::BettingEnvConfig;

use anyhow::{Context, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub betting: BettingEnvConfig,
    pub backtest: BacktestEnvConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let betting = BettingEnvConfig::from_env().context("Failed to load betting config")?;
        let backtest = BacktestEnvConfig::from_env().context("Failed to load backtest config")?;

        Ok(Self { betting, backtest })
    }

    /// Same as [`Config::from_env`] without touching the process environment.
    pub fn from_source(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Self {
            betting: BettingEnvConfig::from_source(lookup)
                .context("Failed to load betting config")?,
            backtest: BacktestEnvConfig::from_source(lookup)
                .context("Failed to load backtest config")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_source_defaults() {
        let config = Config::from_source(&|_| None).expect("Should parse with defaults");
        assert_eq!(config.betting.kelly_fraction, 0.25);
        assert_eq!(config.backtest.n_folds, 3);
    }

    #[test]
    fn test_sub_config_error_carries_context() {
        let err = Config::from_source(&|k| (k == "N_FOLDS").then(|| "x".into())).unwrap_err();
        assert_eq!(err.to_string(), "Failed to load backtest config");
        assert!(format!("{:#}", err).contains("Failed to parse N_FOLDS"));
    }
}
