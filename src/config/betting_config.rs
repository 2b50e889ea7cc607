//! Betting configuration parsing from environment variables.
//!
//! This module handles loading the odds aggregation, data-quality threshold,
//! stake sizing and confidence bucket settings.

use crate::domain::betting::staking::{StakeLimits, StakingPolicy};
use crate::domain::betting::types::OddsType;
use crate::domain::betting::value_bet::ConfidenceThresholds;
use anyhow::{Context, Result};
use std::env;

/// Betting environment configuration
#[derive(Debug, Clone, PartialEq)]
pub struct BettingEnvConfig {
    pub odds_type: OddsType,
    pub drop_na_threshold: f64,

    // Stake sizing
    pub kelly_fraction: f64,
    pub max_stake_pct: f64,
    pub max_stake_abs: f64,
    pub fixed_stake: Option<f64>,
    pub stake_decimals: u32,

    // Confidence buckets
    pub confidence_medium_edge: f64,
    pub confidence_high_edge: f64,

    pub betting_markets: Option<Vec<String>>,
}

impl BettingEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_source(&|key| env::var(key).ok())
    }

    /// Loads from an arbitrary key lookup.
    pub fn from_source(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let odds_type = lookup("ODDS_TYPE")
            .unwrap_or_else(|| "market_maximum".to_string())
            .parse::<OddsType>()
            .context("Failed to parse ODDS_TYPE")?;

        let drop_na_threshold = parse_f64(lookup, "DROP_NA_THRESHOLD", 0.2)?;
        if !(0.0..=1.0).contains(&drop_na_threshold) {
            anyhow::bail!(
                "DROP_NA_THRESHOLD must be between 0 and 1, got {}",
                drop_na_threshold
            );
        }

        let kelly_fraction = parse_f64(lookup, "KELLY_FRACTION", 0.25)?;
        if !(kelly_fraction > 0.0 && kelly_fraction <= 1.0) {
            anyhow::bail!("KELLY_FRACTION must be in (0, 1], got {}", kelly_fraction);
        }

        let max_stake_pct = parse_f64(lookup, "MAX_STAKE_PCT", 0.02)?;
        if !(max_stake_pct > 0.0 && max_stake_pct <= 1.0) {
            anyhow::bail!("MAX_STAKE_PCT must be in (0, 1], got {}", max_stake_pct);
        }

        let max_stake_abs = parse_f64(lookup, "MAX_STAKE_ABS", 500.0)?;
        if !(max_stake_abs > 0.0) {
            anyhow::bail!("MAX_STAKE_ABS must be positive, got {}", max_stake_abs);
        }

        let fixed_stake = match lookup("FIXED_STAKE").filter(|s| !s.trim().is_empty()) {
            Some(raw) => {
                let amount = raw
                    .trim()
                    .parse::<f64>()
                    .context("Failed to parse FIXED_STAKE")?;
                if !(amount > 0.0) {
                    anyhow::bail!("FIXED_STAKE must be positive, got {}", amount);
                }
                Some(amount)
            }
            None => None,
        };

        let confidence_medium_edge = parse_f64(lookup, "CONFIDENCE_MEDIUM_EDGE", 0.03)?;
        let confidence_high_edge = parse_f64(lookup, "CONFIDENCE_HIGH_EDGE", 0.08)?;
        if confidence_medium_edge > confidence_high_edge {
            anyhow::bail!(
                "CONFIDENCE_MEDIUM_EDGE ({}) must not exceed CONFIDENCE_HIGH_EDGE ({})",
                confidence_medium_edge,
                confidence_high_edge
            );
        }

        let betting_markets = lookup("BETTING_MARKETS")
            .map(|s| {
                s.split(',')
                    .map(|m| m.trim().to_string())
                    .filter(|m| !m.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|markets| !markets.is_empty());

        Ok(Self {
            odds_type,
            drop_na_threshold,
            kelly_fraction,
            max_stake_pct,
            max_stake_abs,
            fixed_stake,
            stake_decimals: parse_u32(lookup, "STAKE_DECIMALS", 2)?,
            confidence_medium_edge,
            confidence_high_edge,
            betting_markets,
        })
    }

    /// Builds the staking policy described by this configuration.
    pub fn staking_policy(&self) -> StakingPolicy {
        let limits = StakeLimits {
            max_stake_pct: self.max_stake_pct,
            max_stake_abs: self.max_stake_abs,
        };
        let mut policy = match self.fixed_stake {
            Some(amount) => StakingPolicy::fixed(amount, limits),
            None => StakingPolicy::kelly(self.kelly_fraction, limits),
        }
        .with_thresholds(ConfidenceThresholds {
            medium: self.confidence_medium_edge,
            high: self.confidence_high_edge,
        });
        policy.stake_decimals = self.stake_decimals;
        policy
    }
}

fn parse_f64(lookup: &dyn Fn(&str) -> Option<String>, key: &str, default: f64) -> Result<f64> {
    lookup(key)
        .unwrap_or_else(|| default.to_string())
        .trim()
        .parse::<f64>()
        .context(format!("Failed to parse {}", key))
}

fn parse_u32(lookup: &dyn Fn(&str) -> Option<String>, key: &str, default: u32) -> Result<u32> {
    lookup(key)
        .unwrap_or_else(|| default.to_string())
        .trim()
        .parse::<u32>()
        .context(format!("Failed to parse {}", key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::betting::staking::SizingMode;
    use std::collections::HashMap;

    fn source(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_betting_config_defaults() {
        let config = BettingEnvConfig::from_source(&source(&[])).expect("Should parse with defaults");
        assert_eq!(config.odds_type, OddsType::MarketMaximum);
        assert_eq!(config.drop_na_threshold, 0.2);
        assert_eq!(config.kelly_fraction, 0.25);
        assert_eq!(config.max_stake_pct, 0.02);
        assert_eq!(config.max_stake_abs, 500.0);
        assert!(config.fixed_stake.is_none());
        assert!(config.betting_markets.is_none());

        let policy = config.staking_policy();
        assert_eq!(policy.kelly_fraction(), Some(0.25));
        assert_eq!(policy.thresholds, ConfidenceThresholds::default());
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_fixed_stake_switches_sizing() {
        let config = BettingEnvConfig::from_source(&source(&[
            ("FIXED_STAKE", "50"),
            ("ODDS_TYPE", "Pinnacle"),
            ("BETTING_MARKETS", "home_win, away_win,"),
        ]))
        .unwrap();

        assert_eq!(config.odds_type, OddsType::Bookmaker("Pinnacle".into()));
        assert_eq!(
            config.betting_markets,
            Some(vec!["home_win".to_string(), "away_win".to_string()])
        );
        assert_eq!(
            config.staking_policy().sizing,
            SizingMode::Fixed { amount: 50.0 }
        );
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        for (key, value) in [
            ("KELLY_FRACTION", "0"),
            ("KELLY_FRACTION", "1.5"),
            ("MAX_STAKE_PCT", "2"),
            ("MAX_STAKE_ABS", "-1"),
            ("DROP_NA_THRESHOLD", "1.2"),
            ("FIXED_STAKE", "0"),
        ] {
            let err = BettingEnvConfig::from_source(&source(&[(key, value)])).unwrap_err();
            assert!(err.to_string().contains(key), "{}: {}", key, err);
        }
    }

    #[test]
    fn test_unparseable_value_names_the_variable() {
        let err = BettingEnvConfig::from_source(&source(&[("MAX_STAKE_ABS", "lots")])).unwrap_err();
        assert_eq!(err.to_string(), "Failed to parse MAX_STAKE_ABS");
    }

    #[test]
    fn test_inverted_confidence_thresholds_are_rejected() {
        let result = BettingEnvConfig::from_source(&source(&[
            ("CONFIDENCE_MEDIUM_EDGE", "0.1"),
            ("CONFIDENCE_HIGH_EDGE", "0.05"),
        ]));
        assert!(result.is_err());
    }
}
