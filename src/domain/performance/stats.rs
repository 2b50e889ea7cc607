use statrs::statistics::{Data, Distribution};

/// Shared statistics utilities for bankroll trajectories.
pub struct Stats;

impl Stats {
    /// Sharpe-like ratio of a return series: mean / sample standard deviation.
    ///
    /// Not annualised; betting events have no fixed frequency.
    pub fn sharpe_ratio(returns: &[f64]) -> f64 {
        if returns.len() < 2 {
            return 0.0;
        }

        // f64 boundary for the statistical library
        let data = Data::new(returns.to_vec());
        let (Some(mean), Some(std_dev)) = (data.mean(), data.std_dev()) else {
            return 0.0;
        };

        if std_dev > 1e-12 && mean.is_finite() {
            mean / std_dev
        } else {
            0.0
        }
    }

    pub fn mean(values: &[f64]) -> f64 {
        if values.is_empty() {
            return 0.0;
        }
        Data::new(values.to_vec()).mean().unwrap_or(0.0)
    }

    /// Sample variance; zero for fewer than two values.
    pub fn variance(values: &[f64]) -> f64 {
        if values.len() < 2 {
            return 0.0;
        }
        Data::new(values.to_vec()).variance().unwrap_or(0.0)
    }

    pub fn std_dev(values: &[f64]) -> f64 {
        Self::variance(values).sqrt()
    }

    /// Per-step returns of an equity curve that starts at `initial`.
    ///
    /// Steps from a non-positive value yield a zero return so that the
    /// series stays aligned with the curve.
    pub fn calculate_returns(initial: f64, curve: &[f64]) -> Vec<f64> {
        let mut returns = Vec::with_capacity(curve.len());
        let mut prev = initial;
        for &curr in curve {
            if prev > 0.0 {
                returns.push((curr - prev) / prev);
            } else {
                returns.push(0.0);
            }
            prev = curr;
        }
        returns
    }

    /// Largest peak-to-trough drop of an equity curve starting at `initial`.
    ///
    /// Returns `(absolute drop, drop as a fraction of the peak)`.
    pub fn max_drawdown(initial: f64, curve: &[f64]) -> (f64, f64) {
        let mut peak = initial;
        let mut max_abs = 0.0_f64;
        let mut max_pct = 0.0_f64;

        for &value in curve {
            if value > peak {
                peak = value;
            }
            let drop = peak - value;
            if drop > max_abs {
                max_abs = drop;
            }
            if peak > 0.0 {
                max_pct = max_pct.max(drop / peak);
            }
        }

        (max_abs, max_pct.min(1.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sharpe_ratio() {
        let returns = vec![0.01, 0.02, 0.01, 0.02];
        assert!(Stats::sharpe_ratio(&returns) > 0.0);

        let returns_flat = vec![0.01, 0.01, 0.01];
        assert_eq!(Stats::sharpe_ratio(&returns_flat), 0.0);
        assert_eq!(Stats::sharpe_ratio(&[0.5]), 0.0);
    }

    #[test]
    fn test_max_drawdown() {
        let (abs, pct) = Stats::max_drawdown(100.0, &[110.0, 99.0, 120.0, 108.0]);
        assert!((abs - 12.0).abs() < 1e-12);
        assert!((pct - 0.1).abs() < 1e-12);

        assert_eq!(Stats::max_drawdown(100.0, &[]), (0.0, 0.0));
    }

    #[test]
    fn test_calculate_returns_keeps_alignment() {
        let returns = Stats::calculate_returns(100.0, &[110.0, 0.0, 0.0]);
        assert_eq!(returns.len(), 3);
        assert!((returns[0] - 0.1).abs() < 1e-12);
        assert_eq!(returns[1], -1.0);
        assert_eq!(returns[2], 0.0);
    }

    #[test]
    fn test_variance() {
        assert!((Stats::variance(&[1.0, 2.0, 3.0, 4.0]) - 5.0 / 3.0).abs() < 1e-12);
        assert_eq!(Stats::variance(&[7.0]), 0.0);
    }
}
