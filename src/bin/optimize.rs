//! Strategy Search Binary
//!
//! Crosses bettor templates with a staking parameter grid, scores every
//! configuration with a walk-forward backtest and ranks them.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sportsbet::application::bettors::parse_templates;
use sportsbet::application::optimization::optimizer::{Objective, ParameterGrid, StrategySearch};
use sportsbet::application::optimization::reporting::BacktestReporter;
use sportsbet::config::Config;
use sportsbet::domain::ports::OddsDataLoader;
use sportsbet::infrastructure::{BacktestMetrics, CsvOddsLoader, SyntheticMatchGenerator};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about = "Betting strategy grid search", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the grid search
    Run {
        /// CSV file with one bookmaker quote per row (synthetic league if omitted)
        #[arg(long)]
        data: Option<PathBuf>,

        /// Seed of the synthetic league
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Days of synthetic fixtures
        #[arg(long, default_value = "180")]
        days: u32,

        /// Comma-separated bettor templates (logistic, forest, odds_comparison)
        #[arg(short, long, default_value = "logistic,odds_comparison")]
        bettors: String,

        /// Edge margin of odds-comparison templates
        #[arg(long, default_value = "0.03")]
        alpha: f64,

        /// TOML file with parameter grid configuration
        #[arg(long)]
        grid_config: Option<String>,

        /// Objective (total_return, sharpe_ratio, roi, mean_final_capital)
        #[arg(long, default_value = "total_return")]
        objective: String,

        /// Stop starting new configurations after this many seconds
        #[arg(long)]
        time_budget: Option<u64>,

        /// Evaluate configurations one at a time
        #[arg(long)]
        sequential: bool,

        /// Output JSON file for results
        #[arg(short, long, default_value = "search_results.json")]
        output: String,

        /// Number of top results to display
        #[arg(short, long, default_value = "10")]
        top_n: usize,

        /// Print collected metrics in Prometheus text format
        #[arg(long)]
        metrics: bool,
    },
}

fn main() -> Result<()> {
    // Setup logging
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let reporter = BacktestReporter::new("search_results");

    match cli.command {
        Commands::Run {
            data,
            seed,
            days,
            bettors,
            alpha,
            grid_config,
            objective,
            time_budget,
            sequential,
            output,
            top_n,
            metrics,
        } => {
            let objective = Objective::from_str(&objective)?;
            let staking = config.betting.staking_policy();
            let templates: Vec<_> = parse_templates(&bettors)?
                .into_iter()
                .map(|t| {
                    t.spec(alpha, staking)
                        .with_betting_markets(config.betting.betting_markets.clone())
                })
                .collect();
            if templates.is_empty() {
                anyhow::bail!("At least one bettor template is required");
            }

            let loader: Box<dyn OddsDataLoader> = match &data {
                Some(path) => Box::new(CsvOddsLoader::new(path)),
                None => Box::new(SyntheticMatchGenerator::new(seed).with_days(days)),
            };
            let records = loader
                .load(&config.betting.odds_type, config.betting.drop_na_threshold)
                .context(format!("Failed to load records from {}", loader.name()))?;

            reporter.print_header(
                "STRATEGY SEARCH",
                loader.name(),
                &format!("{} template(s), objective {}", templates.len(), objective),
                &output,
            );

            // Load parameter grid
            let parameter_grid = if let Some(config_file) = grid_config {
                info!("Loading parameter grid from: {}", config_file);
                load_grid_from_toml(&config_file)?
            } else {
                info!("Using default parameter grid");
                ParameterGrid::default()
            };

            let n_templates = templates.len();
            let mut search = StrategySearch::new(
                templates,
                parameter_grid.clone(),
                objective,
                config.backtest.walk_forward_config(),
            );
            if sequential {
                search = search.sequential();
            }
            reporter.print_grid_info(
                &parameter_grid,
                n_templates,
                search.generate_combinations().len(),
            );
            println!("{}\n", "=".repeat(80));

            if let Some(secs) = time_budget {
                let cancel = search.cancel_handle();
                std::thread::spawn(move || {
                    std::thread::sleep(Duration::from_secs(secs));
                    warn!("Time budget of {}s reached, cancelling search", secs);
                    cancel.store(true, Ordering::SeqCst);
                });
            }

            let outcome = search.run(&records)?;
            reporter.print_ranking(&outcome, top_n);
            reporter.print_backtest(&outcome.best_report);
            reporter.export_json(&outcome, &output)?;

            if metrics {
                let registry = BacktestMetrics::new()?;
                registry.record_report(&outcome.best_report);
                registry.record_search(&outcome);
                println!("{}", registry.render());
            }
        }
    }

    Ok(())
}

/// Loads a parameter grid from a TOML file.
fn load_grid_from_toml(path: &str) -> Result<ParameterGrid> {
    let content = std::fs::read_to_string(path)
        .context(format!("Failed to read grid config file: {}", path))?;
    let grid: ParameterGrid =
        toml::from_str(&content).context(format!("Failed to parse grid config TOML: {}", path))?;
    Ok(grid)
}
