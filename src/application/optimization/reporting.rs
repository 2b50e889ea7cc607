//! Reporting utilities for backtests and strategy searches.
//!
//! Provides formatted console output, JSON export of reports and rankings,
//! and CSV export of value bets.

use crate::application::optimization::optimizer::{ParameterGrid, SearchOutcome};
use crate::application::optimization::walk_forward::{BacktestReport, FoldOutcome};
use crate::domain::betting::value_bet::ValueBet;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Reporter for backtest and search output.
pub struct BacktestReporter {
    output_dir: String,
}

impl BacktestReporter {
    /// Creates a new reporter with the given output directory.
    pub fn new(output_dir: &str) -> Self {
        Self {
            output_dir: output_dir.to_string(),
        }
    }

    /// Bare file names land in the output directory; paths are kept as given.
    fn resolve(&self, filename: &str) -> Result<PathBuf> {
        let output_path = if filename.contains('/') || filename.contains('\\') {
            PathBuf::from(filename)
        } else {
            Path::new(&self.output_dir).join(filename)
        };

        if let Some(parent) = output_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create directory: {:?}", parent))?;
        }
        Ok(output_path)
    }

    /// Prints the header banner for a run.
    pub fn print_header(&self, title: &str, source: &str, bettor: &str, output: &str) {
        println!("{}", "=".repeat(80));
        println!("{}", title);
        println!("{}", "=".repeat(80));
        println!("Data:         {}", source);
        println!("Bettor:       {}", bettor);
        println!("Output:       {}", output);
        println!("{}", "=".repeat(80));
    }

    /// Prints per-fold metrics followed by the combined figures.
    pub fn print_backtest(&self, report: &BacktestReport) {
        println!("\n{}", "=".repeat(80));
        println!(
            "WALK-FORWARD BACKTEST - {} folds ({})",
            report.folds.len(),
            report.config.mode
        );
        println!("{}", "=".repeat(80));

        println!(
            "{:<4} | {:>6} | {:>6} | {:>10} | {:>8} | {:>7} | {:>6} | {:>7} | {:>7}",
            "Fold", "Train", "Test", "Final", "Return%", "ROI%", "Bets", "MaxDD%", "Skips"
        );
        println!("{}", "-".repeat(80));

        for fold in &report.folds {
            match &fold.outcome {
                FoldOutcome::Completed { metrics, .. } => println!(
                    "{:<4} | {:>6} | {:>6} | {:>10.2} | {:>8.2} | {:>7.2} | {:>6} | {:>7.2} | {:>7}",
                    fold.index,
                    fold.train_records,
                    fold.test_records,
                    metrics.final_capital,
                    metrics.total_return * 100.0,
                    metrics.roi * 100.0,
                    metrics.bets_placed,
                    metrics.max_drawdown_pct * 100.0,
                    metrics.data_quality_skips
                ),
                FoldOutcome::Excluded { reason } => println!(
                    "{:<4} | {:>6} | {:>6} | excluded: {}",
                    fold.index, fold.train_records, fold.test_records, reason
                ),
            }
        }

        let c = &report.combined;
        println!("{}", "-".repeat(80));
        println!("  Folds completed:   {}", c.folds_completed);
        println!("  Folds excluded:    {}", report.excluded_folds);
        println!("  Combined return:   {:.2}%", c.total_return * 100.0);
        println!("  ROI on turnover:   {:.2}%", c.roi * 100.0);
        println!("  Sharpe-like ratio: {:.3}", c.sharpe_ratio);
        println!("  Max drawdown:      {:.2}%", c.max_drawdown_pct * 100.0);
        println!("  Bets placed/won:   {}/{}", c.bets_placed, c.bets_won);
        println!("  Turnover:          {:.2}", c.total_turnover);
        println!("  Fold return std:   {:.4}", c.fold_return_std);
        println!("  Data-quality skips: {}", report.data_quality_skips);
        println!("{}\n", "=".repeat(80));
    }

    /// Prints a table of value bets, most recent last.
    pub fn print_value_bets(&self, bets: &[ValueBet], limit: usize) {
        println!(
            "{:<16} | {:<32} | {:>6} | {:>6} | {:>7} | {:>8} | {:<6}",
            "Kickoff", "Match", "Prob", "Price", "Edge%", "Stake", "Conf"
        );
        println!("{}", "-".repeat(100));

        let start = bets.len().saturating_sub(limit);
        for bet in &bets[start..] {
            println!(
                "{:<16} | {:<32} | {:>6.3} | {:>6.2} | {:>7.2} | {:>8.2} | {:<6}",
                bet.kickoff.format("%Y-%m-%d %H:%M"),
                bet.description(),
                bet.probability,
                bet.price,
                bet.edge * 100.0,
                bet.stake,
                bet.confidence
            );
        }
        println!("{} value bets ({} shown)\n", bets.len(), bets.len() - start);
    }

    /// Prints the parameter grid configuration.
    pub fn print_grid_info(&self, grid: &ParameterGrid, templates: usize, combinations: usize) {
        println!("\nParameter Grid:");
        println!("  Bettor templates: {}", templates);
        println!("  Kelly fraction:   {:?}", grid.kelly_fraction);
        println!("  Max stake pct:    {:?}", grid.max_stake_pct);
        println!("  Max stake abs:    {:?}", grid.max_stake_abs);
        println!("\nTotal configurations to test: {}", combinations);
    }

    /// Prints a formatted ranking of search results.
    pub fn print_ranking(&self, outcome: &SearchOutcome, top_n: usize) {
        println!("\n{}", "=".repeat(80));
        println!(
            "SEARCH COMPLETE - Top {} by {}{}",
            top_n.min(outcome.ranking.len()),
            outcome.objective,
            if outcome.cancelled { " (cancelled)" } else { "" }
        );
        println!("{}", "=".repeat(80));

        println!(
            "{:<4} | {:<40} | {:>9} | {:>8} | {:>6} | {:>8}",
            "#", "Configuration", "Score", "Return%", "Bets", "FoldVar"
        );
        println!("{}", "-".repeat(80));

        for (i, entry) in outcome.ranking.iter().take(top_n).enumerate() {
            println!(
                "{:<4} | {:<40} | {:>9.4} | {:>8.2} | {:>6} | {:>8.5}",
                i + 1,
                entry.label,
                entry.score,
                entry.metrics.total_return * 100.0,
                entry.metrics.bets_placed,
                entry.fold_return_variance
            );
        }

        if !outcome.failures.is_empty() {
            println!("{}", "-".repeat(80));
            for failure in &outcome.failures {
                println!("FAILED #{} {}: {}", failure.index + 1, failure.label, failure.error);
            }
        }
        if outcome.skipped > 0 {
            println!("{} configurations not evaluated", outcome.skipped);
        }

        println!("{}\n", "=".repeat(80));
    }

    /// Exports any serializable report to a JSON file.
    pub fn export_json<T: Serialize + ?Sized>(&self, value: &T, filename: &str) -> Result<PathBuf> {
        let output_path = self.resolve(filename)?;

        let json_output =
            serde_json::to_string_pretty(value).context("Failed to serialize results to JSON")?;

        std::fs::write(&output_path, json_output)
            .context(format!("Failed to write results to {:?}", output_path))?;

        println!("Results saved to: {}", output_path.display());
        Ok(output_path)
    }

    /// Exports value bets as CSV, one row per bet.
    pub fn export_bets_csv(&self, bets: &[ValueBet], filename: &str) -> Result<PathBuf> {
        let output_path = self.resolve(filename)?;

        let mut writer = csv::Writer::from_path(&output_path)
            .context(format!("Failed to create {:?}", output_path))?;
        for bet in bets {
            writer
                .serialize(bet)
                .context("Failed to serialize value bet")?;
        }
        writer.flush().context("Failed to flush CSV writer")?;

        println!("Value bets saved to: {}", output_path.display());
        Ok(output_path)
    }
}

impl Default for BacktestReporter {
    fn default() -> Self {
        Self::new(".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::betting::value_bet::{Confidence, Settlement};
    use chrono::{TimeZone, Utc};

    fn temp_dir(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "sportsbet_report_{}_{}",
            tag,
            std::process::id()
        ))
    }

    fn bet() -> ValueBet {
        ValueBet {
            match_id: "m1".into(),
            home_team: "Lens".into(),
            away_team: "Lille".into(),
            kickoff: Utc.with_ymd_and_hms(2024, 3, 2, 20, 0, 0).unwrap(),
            outcome: "home_win".into(),
            probability: 0.5,
            price: 2.4,
            edge: 0.2,
            kelly_fraction: 0.142857,
            stake: 20.0,
            potential_profit: 28.0,
            confidence: Confidence::High,
            settlement: Settlement::Won,
            profit: 28.0,
        }
    }

    #[test]
    fn test_export_bets_csv() {
        let dir = temp_dir("csv");
        let reporter = BacktestReporter::new(dir.to_str().unwrap());
        let path = reporter.export_bets_csv(&[bet(), bet()], "bets.csv").unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert!(lines.next().unwrap().starts_with("match_id,home_team,away_team,kickoff"));
        let row = lines.next().unwrap();
        assert!(row.contains("HIGH"));
        assert!(row.contains("won"));
        assert_eq!(content.lines().count(), 3);

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_export_json_creates_directory() {
        let dir = temp_dir("json").join("nested");
        let reporter = BacktestReporter::new(dir.to_str().unwrap());
        let path = reporter.export_json(&vec![bet()], "bets.json").unwrap();

        let parsed: Vec<ValueBet> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed, vec![bet()]);

        std::fs::remove_dir_all(temp_dir("json")).ok();
    }
}
