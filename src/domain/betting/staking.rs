//! Kelly criterion stake sizing
//!
//! Full Kelly fraction for a decimal price `o` and probability `p`:
//!     f* = (p*o - 1) / (o - 1)
//!
//! The applied stake is `bankroll * k * f*` for a damping factor `k`, capped
//! by a fraction of the current bankroll and by an absolute amount.

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::value_bet::{Confidence, ConfidenceThresholds};
use crate::domain::errors::BettingError;

/// Prices within this distance of 1.0 are never staked.
pub const PRICE_EPSILON: f64 = 1e-9;

/// Caps applied to every stake.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StakeLimits {
    /// Maximum stake as a fraction of current bankroll, in (0, 1].
    pub max_stake_pct: f64,
    /// Maximum stake in currency units.
    pub max_stake_abs: f64,
}

impl Default for StakeLimits {
    fn default() -> Self {
        Self {
            max_stake_pct: 0.02,
            max_stake_abs: 500.0,
        }
    }
}

impl StakeLimits {
    pub fn cap(&self, bankroll: f64) -> f64 {
        (bankroll * self.max_stake_pct).min(self.max_stake_abs).max(0.0)
    }

    pub fn validate(&self) -> Result<(), BettingError> {
        if !(self.max_stake_pct > 0.0 && self.max_stake_pct <= 1.0) {
            return Err(BettingError::invalid_config(
                "max_stake_pct",
                format!("must be in (0, 1], got {}", self.max_stake_pct),
            ));
        }
        if !(self.max_stake_abs > 0.0) || !self.max_stake_abs.is_finite() {
            return Err(BettingError::invalid_config(
                "max_stake_abs",
                format!("must be a positive amount, got {}", self.max_stake_abs),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SizingMode {
    /// Fractional Kelly, `fraction` in (0, 1].
    Kelly { fraction: f64 },
    /// Flat stake on every positive-edge bet.
    Fixed { amount: f64 },
}

/// Outcome of sizing one (probability, price) pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StakeDecision {
    pub edge: f64,
    /// Full Kelly fraction `edge / (price - 1)`, zero when undefined.
    pub kelly_fraction: f64,
    pub stake: f64,
    pub confidence: Confidence,
}

impl StakeDecision {
    fn no_bet(edge: f64, confidence: Confidence) -> Self {
        Self {
            edge,
            kelly_fraction: 0.0,
            stake: 0.0,
            confidence,
        }
    }

    /// Drops the stake unless the edge strictly exceeds `min_edge`.
    pub fn require_edge(mut self, min_edge: f64) -> Self {
        if self.edge <= min_edge {
            self.stake = 0.0;
        }
        self
    }
}

/// Pure mapping (probability, price, bankroll) -> bounded stake.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StakingPolicy {
    pub sizing: SizingMode,
    pub limits: StakeLimits,
    pub thresholds: ConfidenceThresholds,
    /// Stakes are rounded down to this many decimals.
    pub stake_decimals: u32,
}

impl Default for StakingPolicy {
    fn default() -> Self {
        Self::kelly(0.25, StakeLimits::default())
    }
}

impl StakingPolicy {
    pub fn kelly(fraction: f64, limits: StakeLimits) -> Self {
        Self {
            sizing: SizingMode::Kelly { fraction },
            limits,
            thresholds: ConfidenceThresholds::default(),
            stake_decimals: 2,
        }
    }

    pub fn fixed(amount: f64, limits: StakeLimits) -> Self {
        Self {
            sizing: SizingMode::Fixed { amount },
            ..Self::kelly(1.0, limits)
        }
    }

    pub fn with_thresholds(mut self, thresholds: ConfidenceThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_limits(mut self, limits: StakeLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_kelly_fraction(mut self, fraction: f64) -> Self {
        self.sizing = SizingMode::Kelly { fraction };
        self
    }

    pub fn kelly_fraction(&self) -> Option<f64> {
        match self.sizing {
            SizingMode::Kelly { fraction } => Some(fraction),
            SizingMode::Fixed { .. } => None,
        }
    }

    pub fn validate(&self) -> Result<(), BettingError> {
        self.limits.validate()?;
        match self.sizing {
            SizingMode::Kelly { fraction } if !(fraction > 0.0 && fraction <= 1.0) => {
                return Err(BettingError::invalid_config(
                    "kelly_fraction",
                    format!("must be in (0, 1], got {}", fraction),
                ));
            }
            SizingMode::Fixed { amount } if !(amount > 0.0) || !amount.is_finite() => {
                return Err(BettingError::invalid_config(
                    "fixed_stake",
                    format!("must be a positive amount, got {}", amount),
                ));
            }
            _ => {}
        }
        if self.thresholds.medium > self.thresholds.high {
            return Err(BettingError::invalid_config(
                "confidence_thresholds",
                format!(
                    "medium edge {} exceeds high edge {}",
                    self.thresholds.medium, self.thresholds.high
                ),
            ));
        }
        Ok(())
    }

    /// Sizes one bet against the bankroll as it stands right now.
    ///
    /// Deterministic: identical inputs yield identical decisions.
    pub fn size(&self, probability: f64, price: f64, bankroll: f64) -> StakeDecision {
        if !probability.is_finite() || !price.is_finite() {
            return StakeDecision::no_bet(f64::NAN, Confidence::Low);
        }

        let edge = probability * price - 1.0;
        let confidence = self.thresholds.classify(edge);

        if edge <= 0.0 || price - 1.0 <= PRICE_EPSILON {
            return StakeDecision::no_bet(edge, confidence);
        }
        if !bankroll.is_finite() || bankroll <= 0.0 {
            return StakeDecision::no_bet(edge, confidence);
        }

        let kelly_fraction = edge / (price - 1.0);
        let applied = match self.sizing {
            SizingMode::Kelly { fraction } => bankroll * fraction * kelly_fraction,
            SizingMode::Fixed { amount } => amount,
        };

        let capped = applied.min(self.limits.cap(bankroll)).min(bankroll).max(0.0);
        let stake = self.round_down(capped);

        debug!(
            "StakingPolicy: p={:.4} o={:.2} edge={:.4} kelly={:.4} applied={:.2} stake={:.2}",
            probability, price, edge, kelly_fraction, applied, stake
        );

        StakeDecision {
            edge,
            kelly_fraction,
            stake,
            confidence,
        }
    }

    /// Truncates towards zero so rounding never lifts a stake above its caps.
    fn round_down(&self, stake: f64) -> f64 {
        Decimal::from_f64_retain(stake)
            .or_else(|| Decimal::from_f64(stake))
            .map(|d| d.round_dp_with_strategy(self.stake_decimals, RoundingStrategy::ToZero))
            .and_then(|d| d.to_f64())
            .unwrap_or(0.0)
            .max(0.0)
    }
}
