//! Walk-forward backtest configuration parsing from environment variables.

use crate::application::optimization::walk_forward::{FoldMode, WalkForwardConfig};
use anyhow::{Context, Result};
use std::env;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestEnvConfig {
    pub initial_cash: f64,
    pub n_folds: usize,
    pub fold_mode: FoldMode,
    pub rolling_window_days: Option<u32>,
    pub min_train_records: usize,
}

impl BacktestEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_source(&|key| env::var(key).ok())
    }

    pub fn from_source(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let initial_cash = lookup("INITIAL_CASH")
            .unwrap_or_else(|| "10000".to_string())
            .trim()
            .parse::<f64>()
            .context("Failed to parse INITIAL_CASH")?;
        if !(initial_cash > 0.0) || !initial_cash.is_finite() {
            anyhow::bail!("INITIAL_CASH must be positive, got {}", initial_cash);
        }

        let n_folds = parse_usize(lookup, "N_FOLDS", 3)?;
        if n_folds < 2 {
            anyhow::bail!("N_FOLDS must be at least 2, got {}", n_folds);
        }

        let fold_mode = lookup("FOLD_MODE")
            .unwrap_or_else(|| "expanding".to_string())
            .parse::<FoldMode>()?;

        let rolling_window_days = match lookup("ROLLING_WINDOW_DAYS").filter(|s| !s.trim().is_empty())
        {
            Some(raw) => {
                let days = raw
                    .trim()
                    .parse::<u32>()
                    .context("Failed to parse ROLLING_WINDOW_DAYS")?;
                if days == 0 {
                    anyhow::bail!("ROLLING_WINDOW_DAYS must be at least 1");
                }
                Some(days)
            }
            None => None,
        };

        Ok(Self {
            initial_cash,
            n_folds,
            fold_mode,
            rolling_window_days,
            min_train_records: parse_usize(lookup, "MIN_TRAIN_RECORDS", 1)?,
        })
    }

    pub fn walk_forward_config(&self) -> WalkForwardConfig {
        WalkForwardConfig {
            n_folds: self.n_folds,
            mode: self.fold_mode,
            rolling_window_days: self.rolling_window_days,
            initial_capital: self.initial_cash,
            min_train_records: self.min_train_records,
        }
    }
}

fn parse_usize(lookup: &dyn Fn(&str) -> Option<String>, key: &str, default: usize) -> Result<usize> {
    lookup(key)
        .unwrap_or_else(|| default.to_string())
        .trim()
        .parse::<usize>()
        .context(format!("Failed to parse {}", key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backtest_config_defaults() {
        let config = BacktestEnvConfig::from_source(&|_| None).expect("Should parse with defaults");
        assert_eq!(config.walk_forward_config(), WalkForwardConfig::default());
    }

    #[test]
    fn test_rolling_mode_with_window() {
        let config = BacktestEnvConfig::from_source(&|key| match key {
            "FOLD_MODE" => Some("Rolling".into()),
            "ROLLING_WINDOW_DAYS" => Some("30".into()),
            "N_FOLDS" => Some("5".into()),
            _ => None,
        })
        .unwrap();

        let wf = config.walk_forward_config();
        assert_eq!(wf.mode, FoldMode::Rolling);
        assert_eq!(wf.rolling_window_days, Some(30));
        assert_eq!(wf.n_folds, 5);
        assert!(wf.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(BacktestEnvConfig::from_source(&|k| (k == "N_FOLDS").then(|| "0".into())).is_err());
        assert!(BacktestEnvConfig::from_source(&|k| (k == "N_FOLDS").then(|| "1".into())).is_err());
        assert!(
            BacktestEnvConfig::from_source(&|k| (k == "INITIAL_CASH").then(|| "-5".into())).is_err()
        );
        assert!(
            BacktestEnvConfig::from_source(&|k| (k == "FOLD_MODE").then(|| "sliding".into()))
                .is_err()
        );
    }
}
