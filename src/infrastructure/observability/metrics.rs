//! Prometheus metrics definitions for backtests
//!
//! All metrics use the `sportsbet_` prefix.

use crate::application::optimization::optimizer::SearchOutcome;
use crate::application::optimization::walk_forward::{BacktestReport, FoldOutcome};
use prometheus::{CounterVec, GaugeVec, HistogramOpts, HistogramVec, Opts, Registry, TextEncoder};
use std::sync::Arc;

#[derive(Clone)]
pub struct BacktestMetrics {
    registry: Arc<Registry>,
    /// Bets with a positive stake, by bettor and confidence bucket
    pub bets_placed_total: CounterVec,
    /// Candidates skipped for missing or invalid data
    pub data_quality_skips_total: CounterVec,
    /// Folds excluded for lack of training data
    pub excluded_folds_total: CounterVec,
    /// Final capital of each completed fold
    pub fold_final_capital: GaugeVec,
    /// Edge of placed bets
    pub bet_edge: HistogramVec,
    /// Strategy search configurations by status
    pub search_configurations_total: CounterVec,
}

impl BacktestMetrics {
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let bets_placed_total = CounterVec::new(
            Opts::new("sportsbet_bets_placed_total", "Total bets placed"),
            &["bettor", "confidence"],
        )?;
        registry.register(Box::new(bets_placed_total.clone()))?;

        let data_quality_skips_total = CounterVec::new(
            Opts::new(
                "sportsbet_data_quality_skips_total",
                "Candidates skipped for missing or invalid prices/probabilities",
            ),
            &["bettor"],
        )?;
        registry.register(Box::new(data_quality_skips_total.clone()))?;

        let excluded_folds_total = CounterVec::new(
            Opts::new(
                "sportsbet_excluded_folds_total",
                "Walk-forward folds excluded from aggregation",
            ),
            &["bettor"],
        )?;
        registry.register(Box::new(excluded_folds_total.clone()))?;

        let fold_final_capital = GaugeVec::new(
            Opts::new(
                "sportsbet_fold_final_capital",
                "Final capital of each completed fold",
            ),
            &["bettor", "fold"],
        )?;
        registry.register(Box::new(fold_final_capital.clone()))?;

        let bet_edge = HistogramVec::new(
            HistogramOpts::new("sportsbet_bet_edge", "Edge of placed bets").buckets(vec![
                0.01, 0.02, 0.03, 0.05, 0.08, 0.12, 0.2, 0.3, 0.5,
            ]),
            &["bettor"],
        )?;
        registry.register(Box::new(bet_edge.clone()))?;

        let search_configurations_total = CounterVec::new(
            Opts::new(
                "sportsbet_search_configurations_total",
                "Strategy search configurations by status",
            ),
            &["status"],
        )?;
        registry.register(Box::new(search_configurations_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            bets_placed_total,
            data_quality_skips_total,
            excluded_folds_total,
            fold_final_capital,
            bet_edge,
            search_configurations_total,
        })
    }

    /// Render all metrics in Prometheus text format
    pub fn render(&self) -> String {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        encoder
            .encode_to_string(&metric_families)
            .unwrap_or_default()
    }

    /// Records the figures of one backtest report.
    pub fn record_report(&self, report: &BacktestReport) {
        let bettor = report.bettor.as_str();

        for fold in &report.folds {
            match &fold.outcome {
                FoldOutcome::Completed { metrics, bets, .. } => {
                    let fold_label = fold.index.to_string();
                    self.fold_final_capital
                        .with_label_values(&[bettor, fold_label.as_str()])
                        .set(metrics.final_capital);
                    for bet in bets.iter().filter(|b| b.stake > 0.0) {
                        let confidence = bet.confidence.to_string();
                        self.bets_placed_total
                            .with_label_values(&[bettor, confidence.as_str()])
                            .inc();
                        self.bet_edge.with_label_values(&[bettor]).observe(bet.edge);
                    }
                }
                FoldOutcome::Excluded { .. } => {
                    self.excluded_folds_total.with_label_values(&[bettor]).inc();
                }
            }
        }

        self.data_quality_skips_total
            .with_label_values(&[bettor])
            .inc_by(report.data_quality_skips as f64);
    }

    /// Records the status counts of a finished strategy search.
    pub fn record_search(&self, outcome: &SearchOutcome) {
        self.search_configurations_total
            .with_label_values(&["completed"])
            .inc_by(outcome.ranking.len() as f64);
        self.search_configurations_total
            .with_label_values(&["failed"])
            .inc_by(outcome.failures.len() as f64);
        self.search_configurations_total
            .with_label_values(&["skipped"])
            .inc_by(outcome.skipped as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = BacktestMetrics::new().expect("Failed to create metrics");
        metrics.search_configurations_total.with_label_values(&["failed"]).inc();
        assert!(metrics.render().contains("sportsbet_"));
    }

    #[test]
    fn test_fold_capital_gauge() {
        let metrics = BacktestMetrics::new().expect("Failed to create metrics");
        metrics
            .fold_final_capital
            .with_label_values(&["kelly", "1"])
            .set(10500.0);
        let output = metrics.render();
        assert!(output.contains("sportsbet_fold_final_capital"));
        assert!(output.contains("10500"));
    }

    #[test]
    fn test_bet_counter() {
        let metrics = BacktestMetrics::new().expect("Failed to create metrics");
        metrics
            .bets_placed_total
            .with_label_values(&["kelly", "HIGH"])
            .inc();
        let output = metrics.render();
        assert!(output.contains("sportsbet_bets_placed_total{bettor=\"kelly\",confidence=\"HIGH\"} 1"));
    }
}
