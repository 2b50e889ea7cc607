use serde::{Deserialize, Serialize};

use super::stats::Stats;
use crate::domain::betting::value_bet::{Settlement, ValueBet};

/// Performance of one walk-forward fold (one independent simulated account).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FoldMetrics {
    pub fold: usize,

    // Capital
    pub initial_capital: f64,
    pub final_capital: f64,
    pub profit: f64,
    /// `final / initial - 1`
    pub total_return: f64,

    // Turnover
    pub turnover: f64,
    /// Profit over total amount staked; zero when nothing was staked.
    pub roi: f64,

    // Drawdown
    pub max_drawdown: f64,
    pub max_drawdown_pct: f64,

    // Bet statistics
    pub bets_placed: usize,
    pub bets_won: usize,
    pub win_rate: f64,
    pub average_edge: f64,

    // Risk-adjusted
    pub sharpe_ratio: f64,

    // Audit
    pub events: usize,
    pub data_quality_skips: usize,
}

impl FoldMetrics {
    /// Computes fold metrics from the simulator output.
    ///
    /// `bets` may contain zero-stake evaluations; only placed bets count
    /// towards turnover, win rate and average edge.
    pub fn calculate(
        fold: usize,
        initial_capital: f64,
        trajectory: &[f64],
        bets: &[ValueBet],
        data_quality_skips: usize,
    ) -> Self {
        let final_capital = trajectory.last().copied().unwrap_or(initial_capital);
        let profit = final_capital - initial_capital;
        let total_return = if initial_capital > 0.0 {
            final_capital / initial_capital - 1.0
        } else {
            0.0
        };

        let placed: Vec<&ValueBet> = bets.iter().filter(|b| b.stake > 0.0).collect();
        let bets_placed = placed.len();
        let bets_won = placed
            .iter()
            .filter(|b| b.settlement == Settlement::Won)
            .count();
        let decided = placed
            .iter()
            .filter(|b| matches!(b.settlement, Settlement::Won | Settlement::Lost))
            .count();
        let win_rate = if decided > 0 {
            bets_won as f64 / decided as f64
        } else {
            0.0
        };

        let turnover: f64 = placed.iter().map(|b| b.stake).sum();
        let roi = if turnover > 0.0 {
            placed.iter().map(|b| b.profit).sum::<f64>() / turnover
        } else {
            0.0
        };
        let edges: Vec<f64> = placed.iter().map(|b| b.edge).collect();
        let average_edge = Stats::mean(&edges);

        let (max_drawdown, max_drawdown_pct) = Stats::max_drawdown(initial_capital, trajectory);
        let returns = Stats::calculate_returns(initial_capital, trajectory);

        Self {
            fold,
            initial_capital,
            final_capital,
            profit,
            total_return,
            turnover,
            roi,
            max_drawdown,
            max_drawdown_pct,
            bets_placed,
            bets_won,
            win_rate,
            average_edge,
            sharpe_ratio: Stats::sharpe_ratio(&returns),
            events: trajectory.len(),
            data_quality_skips,
        }
    }
}

/// Aggregate over completed folds.
///
/// Each fold is an independent account: trajectories are concatenated as
/// return series, never pooled as capital.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CombinedMetrics {
    pub folds_completed: usize,
    /// Compounded return across folds: `prod(1 + r_i) - 1`.
    pub total_return: f64,
    pub sharpe_ratio: f64,
    /// Max drawdown of the compounded, concatenated curve (fraction of peak).
    pub max_drawdown_pct: f64,
    pub mean_final_capital: f64,
    pub total_profit: f64,
    pub total_turnover: f64,
    pub roi: f64,
    pub bets_placed: usize,
    pub bets_won: usize,
    pub events: usize,
    pub data_quality_skips: usize,
    pub fold_return_mean: f64,
    pub fold_return_std: f64,
    pub fold_return_variance: f64,
}

impl CombinedMetrics {
    /// `folds` pairs each completed fold's metrics with its trajectory, in
    /// fold order.
    pub fn combine(folds: &[(&FoldMetrics, &[f64])]) -> Self {
        if folds.is_empty() {
            return Self::default();
        }

        let mut returns = Vec::new();
        for (metrics, trajectory) in folds {
            returns.extend(Stats::calculate_returns(metrics.initial_capital, trajectory));
        }

        let mut curve = Vec::with_capacity(returns.len());
        let mut equity = 1.0;
        for r in &returns {
            equity *= 1.0 + r;
            curve.push(equity);
        }
        let (_, max_drawdown_pct) = Stats::max_drawdown(1.0, &curve);

        let fold_returns: Vec<f64> = folds.iter().map(|(m, _)| m.total_return).collect();
        let total_return = fold_returns.iter().map(|r| 1.0 + r).product::<f64>() - 1.0;

        let total_profit: f64 = folds.iter().map(|(m, _)| m.profit).sum();
        let total_turnover: f64 = folds.iter().map(|(m, _)| m.turnover).sum();
        let staked_profit: f64 = folds.iter().map(|(m, _)| m.roi * m.turnover).sum();
        let roi = if total_turnover > 0.0 {
            staked_profit / total_turnover
        } else {
            0.0
        };
        let finals: Vec<f64> = folds.iter().map(|(m, _)| m.final_capital).collect();

        Self {
            folds_completed: folds.len(),
            total_return,
            sharpe_ratio: Stats::sharpe_ratio(&returns),
            max_drawdown_pct,
            mean_final_capital: Stats::mean(&finals),
            total_profit,
            total_turnover,
            roi,
            bets_placed: folds.iter().map(|(m, _)| m.bets_placed).sum(),
            bets_won: folds.iter().map(|(m, _)| m.bets_won).sum(),
            events: folds.iter().map(|(m, _)| m.events).sum(),
            data_quality_skips: folds.iter().map(|(m, _)| m.data_quality_skips).sum(),
            fold_return_mean: Stats::mean(&fold_returns),
            fold_return_std: Stats::std_dev(&fold_returns),
            fold_return_variance: Stats::variance(&fold_returns),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::betting::value_bet::Confidence;
    use chrono::{TimeZone, Utc};

    fn bet(stake: f64, price: f64, edge: f64, settlement: Settlement) -> ValueBet {
        let profit = match settlement {
            Settlement::Won => stake * (price - 1.0),
            Settlement::Lost => -stake,
            _ => 0.0,
        };
        ValueBet {
            match_id: "m".into(),
            home_team: "A".into(),
            away_team: "B".into(),
            kickoff: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            outcome: "home_win".into(),
            probability: 0.5,
            price,
            edge,
            kelly_fraction: 0.0,
            stake,
            potential_profit: stake * (price - 1.0),
            confidence: Confidence::Medium,
            settlement,
            profit,
        }
    }

    #[test]
    fn test_fold_metrics_calculation() {
        let bets = vec![
            bet(10.0, 2.0, 0.05, Settlement::Won),
            bet(10.0, 3.0, 0.10, Settlement::Lost),
            bet(0.0, 1.5, -0.1, Settlement::Void),
        ];
        let trajectory = vec![110.0, 100.0, 100.0];

        let metrics = FoldMetrics::calculate(1, 100.0, &trajectory, &bets, 2);

        assert_eq!(metrics.bets_placed, 2);
        assert_eq!(metrics.bets_won, 1);
        assert!((metrics.win_rate - 0.5).abs() < 1e-12);
        assert!((metrics.turnover - 20.0).abs() < 1e-12);
        assert_eq!(metrics.roi, 0.0);
        assert!((metrics.average_edge - 0.075).abs() < 1e-12);
        assert!((metrics.max_drawdown - 10.0).abs() < 1e-12);
        assert_eq!(metrics.events, 3);
        assert_eq!(metrics.data_quality_skips, 2);
        assert_eq!(metrics.total_return, 0.0);
    }

    #[test]
    fn test_empty_fold_keeps_initial_capital() {
        let metrics = FoldMetrics::calculate(1, 500.0, &[], &[], 0);
        assert_eq!(metrics.final_capital, 500.0);
        assert_eq!(metrics.total_return, 0.0);
        assert_eq!(metrics.win_rate, 0.0);
    }

    #[test]
    fn test_combined_metrics_compound_fold_returns() {
        let a = FoldMetrics::calculate(1, 100.0, &[110.0], &[], 0);
        let b = FoldMetrics::calculate(2, 100.0, &[90.0], &[], 1);
        let traj_a = [110.0];
        let traj_b = [90.0];

        let combined = CombinedMetrics::combine(&[(&a, &traj_a[..]), (&b, &traj_b[..])]);

        assert_eq!(combined.folds_completed, 2);
        assert!((combined.total_return - (1.1 * 0.9 - 1.0)).abs() < 1e-12);
        assert!((combined.mean_final_capital - 100.0).abs() < 1e-12);
        assert!((combined.fold_return_variance - 0.02).abs() < 1e-12);
        assert!((combined.max_drawdown_pct - 0.1).abs() < 1e-12);
        assert_eq!(combined.data_quality_skips, 1);
    }

    #[test]
    fn test_combine_nothing() {
        let combined = CombinedMetrics::combine(&[]);
        assert_eq!(combined.folds_completed, 0);
        assert_eq!(combined.total_return, 0.0);
    }
}
