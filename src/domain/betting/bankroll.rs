use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::staking::StakeLimits;
use crate::domain::errors::BettingError;

/// Lifecycle of one simulated account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationPhase {
    Initialized,
    Running,
    Settled,
}

/// Capital of one simulated account plus its trajectory.
///
/// Owned by exactly one simulator run; every walk-forward fold opens a new one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankrollState {
    initial_capital: f64,
    limits: StakeLimits,
    capital: f64,
    trajectory: Vec<f64>,
    phase: SimulationPhase,
    last_event: Option<DateTime<Utc>>,
}

impl BankrollState {
    pub fn new(initial_capital: f64, limits: StakeLimits) -> Result<Self, BettingError> {
        if !initial_capital.is_finite() || initial_capital < 0.0 {
            return Err(BettingError::invalid_config(
                "initial_cash",
                format!("must be a non-negative amount, got {}", initial_capital),
            ));
        }
        Ok(Self {
            initial_capital,
            limits,
            capital: initial_capital,
            trajectory: Vec::new(),
            phase: SimulationPhase::Initialized,
            last_event: None,
        })
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn capital(&self) -> f64 {
        self.capital
    }

    pub fn limits(&self) -> &StakeLimits {
        &self.limits
    }

    pub fn trajectory(&self) -> &[f64] {
        &self.trajectory
    }

    pub fn phase(&self) -> SimulationPhase {
        self.phase
    }

    /// Opens the next event. Events must arrive in non-decreasing time order.
    pub fn begin_event(&mut self, timestamp: DateTime<Utc>) -> Result<(), BettingError> {
        if self.phase == SimulationPhase::Settled {
            return Err(BettingError::InvariantViolation(
                "event received after the bankroll was settled".to_string(),
            ));
        }
        if let Some(last) = self.last_event
            && timestamp < last
        {
            return Err(BettingError::InvariantViolation(format!(
                "event at {} arrived after event at {}",
                timestamp, last
            )));
        }
        self.last_event = Some(timestamp);
        self.phase = SimulationPhase::Running;
        Ok(())
    }

    /// Applies the profit or loss of a settled stake and returns it.
    ///
    /// `won == None` voids the bet (unsettled match); capital is unchanged.
    pub fn settle(&mut self, stake: f64, price: f64, won: Option<bool>) -> Result<f64, BettingError> {
        if self.phase != SimulationPhase::Running {
            return Err(BettingError::InvariantViolation(format!(
                "settlement outside a running event (phase {:?})",
                self.phase
            )));
        }
        if stake < 0.0 || stake > self.capital || !stake.is_finite() {
            return Err(BettingError::InvariantViolation(format!(
                "stake {} outside [0, {}]",
                stake, self.capital
            )));
        }

        let pnl = match won {
            Some(true) => stake * (price - 1.0),
            Some(false) => -stake,
            None => 0.0,
        };
        self.capital += pnl;

        if self.capital < 0.0 || !self.capital.is_finite() {
            return Err(BettingError::InvariantViolation(format!(
                "bankroll became {} after settling stake {}",
                self.capital, stake
            )));
        }
        Ok(pnl)
    }

    /// Appends the current capital to the trajectory, closing the event.
    pub fn record_point(&mut self) {
        self.trajectory.push(self.capital);
    }

    pub fn finish(&mut self) {
        self.phase = SimulationPhase::Settled;
    }
}
