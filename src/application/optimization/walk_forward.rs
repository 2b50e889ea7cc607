//! Walk-forward backtesting
//!
//! The time span of the data is cut into `n_folds` equal, consecutive test
//! windows. Fold `i` trains a fresh bettor on data strictly before its test
//! window (everything, or a trailing window) and replays the test window on
//! a fresh bankroll. Fold 0 has nothing before it and is reported as
//! excluded.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use super::simulator::BankrollSimulator;
use crate::application::bettors::{Bettor, BettorSpec};
use crate::domain::betting::types::OddsOutcomeRecord;
use crate::domain::betting::value_bet::ValueBet;
use crate::domain::errors::BettingError;
use crate::domain::performance::metrics::{CombinedMetrics, FoldMetrics};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoldMode {
    /// Train on all data before the test window.
    Expanding,
    /// Train on a fixed-size trailing window.
    Rolling,
}

impl fmt::Display for FoldMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FoldMode::Expanding => write!(f, "expanding"),
            FoldMode::Rolling => write!(f, "rolling"),
        }
    }
}

impl FromStr for FoldMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "expanding" => Ok(FoldMode::Expanding),
            "rolling" => Ok(FoldMode::Rolling),
            _ => anyhow::bail!(
                "Invalid FOLD_MODE: {}. Must be 'expanding' or 'rolling'",
                s
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WalkForwardConfig {
    pub n_folds: usize,
    pub mode: FoldMode,
    /// Rolling training window in days; defaults to the test window width.
    pub rolling_window_days: Option<u32>,
    pub initial_capital: f64,
    /// Folds with fewer training records are excluded.
    pub min_train_records: usize,
}

impl Default for WalkForwardConfig {
    fn default() -> Self {
        Self {
            n_folds: 3,
            mode: FoldMode::Expanding,
            rolling_window_days: None,
            initial_capital: 10_000.0,
            min_train_records: 1,
        }
    }
}

impl WalkForwardConfig {
    pub fn validate(&self) -> Result<(), BettingError> {
        // fold 0 never has training data
        if self.n_folds < 2 {
            return Err(BettingError::invalid_config(
                "n_folds",
                format!("must be at least 2, got {}", self.n_folds),
            ));
        }
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(BettingError::invalid_config(
                "initial_cash",
                format!("must be positive, got {}", self.initial_capital),
            ));
        }
        if self.rolling_window_days == Some(0) {
            return Err(BettingError::invalid_config(
                "rolling_window_days",
                "must be at least one day",
            ));
        }
        Ok(())
    }
}

/// Index ranges of one fold over the kickoff-sorted records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FoldSplit {
    pub index: usize,
    pub train: (usize, usize),
    pub test: (usize, usize),
    pub test_start: DateTime<Utc>,
    pub test_end: DateTime<Utc>,
}

/// Computes fold boundaries. `records` must be sorted by kickoff.
pub fn split_folds(
    records: &[OddsOutcomeRecord],
    config: &WalkForwardConfig,
) -> Result<Vec<FoldSplit>, BettingError> {
    config.validate()?;
    let (Some(first), Some(last)) = (records.first(), records.last()) else {
        return Ok(Vec::new());
    };

    let t0 = first.kickoff();
    let span = last.kickoff() - t0;
    let n = config.n_folds as i32;
    let width = span / n;
    let train_window = match config.rolling_window_days {
        Some(days) => Duration::days(days as i64),
        None => width,
    };

    let start_index = |t: DateTime<Utc>| records.partition_point(|r| r.kickoff() < t);

    let mut splits = Vec::with_capacity(config.n_folds);
    for i in 0..config.n_folds {
        let test_start = t0 + width * i as i32;
        let is_last = i + 1 == config.n_folds;
        let test_end = if is_last {
            last.kickoff()
        } else {
            t0 + width * (i as i32 + 1)
        };

        let test_from = if i == 0 { 0 } else { start_index(test_start) };
        let test_to = if is_last {
            records.len()
        } else {
            start_index(test_end)
        };

        let train_to = test_from;
        let train_from = match config.mode {
            FoldMode::Expanding => 0,
            FoldMode::Rolling => start_index(test_start - train_window).min(train_to),
        };

        splits.push(FoldSplit {
            index: i,
            train: (train_from, train_to),
            test: (test_from, test_to),
            test_start,
            test_end,
        });
    }
    Ok(splits)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FoldOutcome {
    Completed {
        metrics: FoldMetrics,
        trajectory: Vec<f64>,
        bets: Vec<ValueBet>,
    },
    Excluded {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldReport {
    pub index: usize,
    pub train_records: usize,
    pub test_records: usize,
    pub train_start: Option<DateTime<Utc>>,
    pub train_end: Option<DateTime<Utc>>,
    pub test_start: DateTime<Utc>,
    pub test_end: DateTime<Utc>,
    pub outcome: FoldOutcome,
}

impl FoldReport {
    pub fn metrics(&self) -> Option<&FoldMetrics> {
        match &self.outcome {
            FoldOutcome::Completed { metrics, .. } => Some(metrics),
            FoldOutcome::Excluded { .. } => None,
        }
    }

    pub fn is_excluded(&self) -> bool {
        matches!(self.outcome, FoldOutcome::Excluded { .. })
    }
}

/// Fold-level report of one backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub bettor: String,
    pub config: WalkForwardConfig,
    pub folds: Vec<FoldReport>,
    pub combined: CombinedMetrics,
    pub excluded_folds: usize,
    pub data_quality_skips: usize,
}

impl BacktestReport {
    pub fn completed_folds(&self) -> impl Iterator<Item = &FoldReport> {
        self.folds.iter().filter(|f| !f.is_excluded())
    }

    /// Placed bets of all completed folds, in fold then event order.
    pub fn placed_bets(&self) -> Vec<ValueBet> {
        self.folds
            .iter()
            .filter_map(|f| match &f.outcome {
                FoldOutcome::Completed { bets, .. } => Some(bets),
                FoldOutcome::Excluded { .. } => None,
            })
            .flatten()
            .filter(|b| b.stake > 0.0)
            .cloned()
            .collect()
    }

    /// Per-fold total returns of completed folds.
    pub fn fold_returns(&self) -> Vec<f64> {
        self.completed_folds()
            .filter_map(|f| f.metrics())
            .map(|m| m.total_return)
            .collect()
    }
}

fn sorted(records: &[OddsOutcomeRecord]) -> Vec<OddsOutcomeRecord> {
    let mut sorted = records.to_vec();
    // stable: equal kickoffs keep their input order
    sorted.sort_by_key(|r| r.kickoff());
    sorted
}

fn run_fold(
    spec: &BettorSpec,
    split: &FoldSplit,
    records: &[OddsOutcomeRecord],
    config: &WalkForwardConfig,
) -> Result<FoldOutcome, BettingError> {
    let train = &records[split.train.0..split.train.1];
    let test = &records[split.test.0..split.test.1];

    if train.len() < config.min_train_records.max(1) {
        let reason = BettingError::InsufficientData {
            available: train.len(),
            required: config.min_train_records.max(1),
        }
        .to_string();
        warn!("WalkForward: fold {} excluded: {}", split.index, reason);
        return Ok(FoldOutcome::Excluded { reason });
    }

    let mut bettor = spec.build();
    match bettor.fit(train) {
        Ok(()) => {}
        Err(e) if e.is_fold_recoverable() => {
            warn!("WalkForward: fold {} excluded: {}", split.index, e);
            return Ok(FoldOutcome::Excluded {
                reason: e.to_string(),
            });
        }
        Err(e) => return Err(e),
    }

    let candidates = bettor.candidates(test)?;
    let simulation =
        BankrollSimulator::new(*bettor.staking(), config.initial_capital).run(&candidates)?;

    let metrics = FoldMetrics::calculate(
        split.index,
        simulation.initial_capital,
        &simulation.trajectory,
        &simulation.bets,
        simulation.data_quality_skips,
    );

    info!(
        "WalkForward: fold {} train={} test={} bets={} return={:.2}% final={:.2}",
        split.index,
        train.len(),
        test.len(),
        metrics.bets_placed,
        metrics.total_return * 100.0,
        metrics.final_capital
    );

    Ok(FoldOutcome::Completed {
        metrics,
        trajectory: simulation.trajectory,
        bets: simulation.bets,
    })
}

/// Runs the walk-forward backtest of one bettor configuration.
///
/// Folds without enough training data are excluded and counted; invariant
/// violations and forecaster failures halt the run.
pub fn backtest(
    spec: &BettorSpec,
    records: &[OddsOutcomeRecord],
    config: &WalkForwardConfig,
) -> Result<BacktestReport, BettingError> {
    spec.validate()?;
    if records.is_empty() {
        return Err(BettingError::InsufficientData {
            available: 0,
            required: config.n_folds,
        });
    }

    let records = sorted(records);
    let splits = split_folds(&records, config)?;
    info!(
        "WalkForward: {} records, {} {} folds, bettor {}",
        records.len(),
        splits.len(),
        config.mode,
        spec.label()
    );

    let mut folds = Vec::with_capacity(splits.len());
    for split in &splits {
        let outcome = run_fold(spec, split, &records, config)?;
        let (train_start, train_end) = if split.train.0 < split.train.1 {
            (
                Some(records[split.train.0].kickoff()),
                Some(records[split.train.1 - 1].kickoff()),
            )
        } else {
            (None, None)
        };
        folds.push(FoldReport {
            index: split.index,
            train_records: split.train.1 - split.train.0,
            test_records: split.test.1 - split.test.0,
            train_start,
            train_end,
            test_start: split.test_start,
            test_end: split.test_end,
            outcome,
        });
    }

    let completed: Vec<(&FoldMetrics, &[f64])> = folds
        .iter()
        .filter_map(|f| match &f.outcome {
            FoldOutcome::Completed {
                metrics,
                trajectory,
                ..
            } => Some((metrics, trajectory.as_slice())),
            FoldOutcome::Excluded { .. } => None,
        })
        .collect();
    if completed.is_empty() {
        let largest_train = folds.iter().map(|f| f.train_records).max().unwrap_or(0);
        warn!(
            "WalkForward: no fold completed for {} ({} excluded)",
            spec.label(),
            folds.len()
        );
        return Err(BettingError::InsufficientData {
            available: largest_train,
            required: config.min_train_records.max(1),
        });
    }
    let combined = CombinedMetrics::combine(&completed);
    let excluded_folds = folds.iter().filter(|f| f.is_excluded()).count();

    info!(
        "WalkForward: done, {} completed, {} excluded, combined return {:.2}%",
        combined.folds_completed,
        excluded_folds,
        combined.total_return * 100.0
    );

    Ok(BacktestReport {
        bettor: spec.label(),
        config: config.clone(),
        data_quality_skips: combined.data_quality_skips,
        folds,
        combined,
        excluded_folds,
    })
}

/// Same run as [`backtest`], returning only the bets actually placed.
pub fn value_bet_backtest(
    spec: &BettorSpec,
    records: &[OddsOutcomeRecord],
    config: &WalkForwardConfig,
) -> Result<Vec<ValueBet>, BettingError> {
    Ok(backtest(spec, records, config)?.placed_bets())
}
