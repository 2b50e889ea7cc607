use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use tracing::{info, warn};

use super::walk_forward::{BacktestReport, WalkForwardConfig, backtest};
use crate::application::bettors::BettorSpec;
use crate::domain::betting::staking::{SizingMode, StakeLimits};
use crate::domain::betting::types::OddsOutcomeRecord;
use crate::domain::errors::BettingError;
use crate::domain::performance::metrics::CombinedMetrics;

/// Staking parameters explored around every bettor template.
///
/// An empty axis keeps the template's own value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterGrid {
    #[serde(default)]
    pub kelly_fraction: Vec<f64>,
    #[serde(default)]
    pub max_stake_pct: Vec<f64>,
    #[serde(default)]
    pub max_stake_abs: Vec<f64>,
}

impl Default for ParameterGrid {
    fn default() -> Self {
        Self {
            kelly_fraction: vec![0.1, 0.25, 0.5],
            max_stake_pct: vec![0.01, 0.02, 0.05],
            max_stake_abs: vec![100.0, 500.0],
        }
    }
}

impl ParameterGrid {
    /// Crosses every template with the grid, in template then axis order.
    /// Kelly fractions do not apply to fixed-stake templates.
    pub fn generate_combinations(&self, templates: &[BettorSpec]) -> Vec<BettorSpec> {
        let mut combinations = Vec::new();

        for template in templates {
            let base = *template.staking();
            let fractions: Vec<Option<f64>> = match base.sizing {
                SizingMode::Kelly { .. } if !self.kelly_fraction.is_empty() => {
                    self.kelly_fraction.iter().map(|k| Some(*k)).collect()
                }
                _ => vec![None],
            };
            let pcts = axis(&self.max_stake_pct, base.limits.max_stake_pct);
            let abss = axis(&self.max_stake_abs, base.limits.max_stake_abs);

            for fraction in &fractions {
                for &max_stake_pct in &pcts {
                    for &max_stake_abs in &abss {
                        let mut policy = base.with_limits(StakeLimits {
                            max_stake_pct,
                            max_stake_abs,
                        });
                        if let Some(k) = fraction {
                            policy = policy.with_kelly_fraction(*k);
                        }
                        combinations.push(template.clone().with_staking(policy));
                    }
                }
            }
        }

        combinations
    }
}

fn axis(values: &[f64], fallback: f64) -> Vec<f64> {
    if values.is_empty() {
        vec![fallback]
    } else {
        values.to_vec()
    }
}

/// Scoring function over an aggregate backtest report. Higher is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Objective {
    TotalReturn,
    SharpeRatio,
    Roi,
    MeanFinalCapital,
}

impl Objective {
    pub fn score(&self, report: &BacktestReport) -> f64 {
        let c = &report.combined;
        match self {
            Objective::TotalReturn => c.total_return,
            Objective::SharpeRatio => c.sharpe_ratio,
            Objective::Roi => c.roi,
            Objective::MeanFinalCapital => c.mean_final_capital,
        }
    }
}

impl fmt::Display for Objective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Objective::TotalReturn => write!(f, "total_return"),
            Objective::SharpeRatio => write!(f, "sharpe_ratio"),
            Objective::Roi => write!(f, "roi"),
            Objective::MeanFinalCapital => write!(f, "mean_final_capital"),
        }
    }
}

impl FromStr for Objective {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "total_return" | "return" => Ok(Objective::TotalReturn),
            "sharpe_ratio" | "sharpe" => Ok(Objective::SharpeRatio),
            "roi" => Ok(Objective::Roi),
            "mean_final_capital" | "final_capital" => Ok(Objective::MeanFinalCapital),
            _ => anyhow::bail!(
                "Unknown objective '{}'. Use total_return, sharpe_ratio, roi or mean_final_capital",
                s
            ),
        }
    }
}

/// One successfully evaluated configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedConfig {
    /// Position in the generated grid.
    pub index: usize,
    pub label: String,
    pub spec: BettorSpec,
    pub score: f64,
    pub fold_return_variance: f64,
    pub metrics: CombinedMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchFailure {
    pub index: usize,
    pub label: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchOutcome {
    pub objective: Objective,
    pub best_spec: BettorSpec,
    pub best_report: BacktestReport,
    /// Best first.
    pub ranking: Vec<RankedConfig>,
    pub failures: Vec<SearchFailure>,
    /// Configurations never started because the search was cancelled.
    pub skipped: usize,
    pub cancelled: bool,
}

enum Evaluation {
    Done {
        index: usize,
        spec: BettorSpec,
        result: Result<BacktestReport, BettingError>,
    },
    Skipped,
}

/// Orders by score (descending, NaN last), then by lower variance of
/// per-fold returns, then by grid position.
fn rank(a: &RankedConfig, b: &RankedConfig) -> Ordering {
    let key = |s: f64| if s.is_nan() { f64::NEG_INFINITY } else { s };
    key(b.score)
        .total_cmp(&key(a.score))
        .then_with(|| a.fold_return_variance.total_cmp(&b.fold_return_variance))
        .then_with(|| a.index.cmp(&b.index))
}

/// Grid search over bettor configurations, scored by walk-forward backtests.
pub struct StrategySearch {
    templates: Vec<BettorSpec>,
    grid: ParameterGrid,
    objective: Objective,
    config: WalkForwardConfig,
    parallel: bool,
    cancel: Arc<AtomicBool>,
}

impl StrategySearch {
    pub fn new(
        templates: Vec<BettorSpec>,
        grid: ParameterGrid,
        objective: Objective,
        config: WalkForwardConfig,
    ) -> Self {
        Self {
            templates,
            grid,
            objective,
            config,
            parallel: true,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    /// Setting the returned flag stops the search before the next configuration.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn generate_combinations(&self) -> Vec<BettorSpec> {
        self.grid.generate_combinations(&self.templates)
    }

    /// Runs the search over a read-only record set shared by all workers.
    pub fn run(&self, records: &[OddsOutcomeRecord]) -> Result<SearchOutcome, BettingError> {
        let combinations = self.generate_combinations();
        let total = combinations.len();
        info!(
            "GridSearch: Starting search with {} configurations (objective={}, parallel={})",
            total, self.objective, self.parallel
        );

        let evaluate = |(index, spec): (usize, BettorSpec)| -> Evaluation {
            if self.cancel.load(AtomicOrdering::SeqCst) {
                return Evaluation::Skipped;
            }
            info!(
                "GridSearch: Testing configuration {}/{}: {}",
                index + 1,
                total,
                spec.label()
            );
            let result = backtest(&spec, records, &self.config);
            Evaluation::Done {
                index,
                spec,
                result,
            }
        };

        let evaluations: Vec<Evaluation> = if self.parallel {
            combinations
                .into_par_iter()
                .enumerate()
                .map(evaluate)
                .collect()
        } else {
            combinations.into_iter().enumerate().map(evaluate).collect()
        };

        let mut ranking = Vec::new();
        let mut reports = Vec::new();
        let mut failures = Vec::new();
        let mut skipped = 0;

        for evaluation in evaluations {
            match evaluation {
                Evaluation::Skipped => skipped += 1,
                Evaluation::Done {
                    index,
                    spec,
                    result: Ok(report),
                } => {
                    let score = self.objective.score(&report);
                    info!(
                        "GridSearch: Result #{} - {}={:.4}, Return={:.2}%, Bets={}",
                        index + 1,
                        self.objective,
                        score,
                        report.combined.total_return * 100.0,
                        report.combined.bets_placed
                    );
                    ranking.push(RankedConfig {
                        index,
                        label: spec.label(),
                        fold_return_variance: report.combined.fold_return_variance,
                        metrics: report.combined.clone(),
                        spec,
                        score,
                    });
                    reports.push((index, report));
                }
                Evaluation::Done {
                    index,
                    spec,
                    result: Err(e),
                } => {
                    warn!("GridSearch: Evaluation #{} failed: {}", index + 1, e);
                    failures.push(SearchFailure {
                        index,
                        label: spec.label(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let cancelled = skipped > 0;
        if cancelled {
            warn!(
                "GridSearch: cancelled, {} of {} configurations not evaluated",
                skipped, total
            );
        }

        ranking.sort_by(rank);
        let Some(best) = ranking.first() else {
            return Err(BettingError::SearchExhausted {
                failed: failures.len(),
            });
        };
        let best_index = best.index;
        let best_spec = best.spec.clone();
        let best_report = reports
            .into_iter()
            .find(|(i, _)| *i == best_index)
            .map(|(_, r)| r)
            .ok_or_else(|| {
                BettingError::InvariantViolation("best configuration lost its report".to_string())
            })?;

        info!(
            "GridSearch: Best configuration #{}: {} ({}={:.4})",
            best_index + 1,
            best.label,
            self.objective,
            best.score
        );

        Ok(SearchOutcome {
            objective: self.objective,
            best_spec,
            best_report,
            ranking,
            failures,
            skipped,
            cancelled,
        })
    }
}
