//! Walk-Forward Backtest Binary
//!
//! Backtests a bettor over historical odds, lists the value bets it would
//! have placed, or fits it on settled matches and stakes the upcoming ones.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use sportsbet::application::bettors::{Bettor, BettorSpec, BettorTemplate};
use sportsbet::application::optimization::reporting::BacktestReporter;
use sportsbet::application::optimization::{backtest, value_bet_backtest};
use sportsbet::config::Config;
use sportsbet::domain::betting::types::OddsOutcomeRecord;
use sportsbet::domain::ports::OddsDataLoader;
use sportsbet::infrastructure::{
    BacktestMetrics, CsvOddsLoader, FileBettorStore, SyntheticMatchGenerator,
};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about = "Walk-forward betting backtester", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DataArgs {
    /// CSV file with one bookmaker quote per row (synthetic league if omitted)
    #[arg(long)]
    data: Option<PathBuf>,

    /// Seed of the synthetic league
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Days of synthetic fixtures
    #[arg(long, default_value = "180")]
    days: u32,

    /// Trailing synthetic days left unsettled
    #[arg(long, default_value = "0")]
    unsettled_days: u32,
}

#[derive(Args)]
struct BettorArgs {
    /// Bettor template (logistic, forest, odds_comparison)
    #[arg(short, long, default_value = "logistic")]
    bettor: String,

    /// Edge margin of the odds-comparison bettor
    #[arg(long, default_value = "0.03")]
    alpha: f64,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a walk-forward backtest and export the report
    Run {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        bettor: BettorArgs,

        /// Output JSON file for the report
        #[arg(short, long, default_value = "backtest_report.json")]
        output: String,

        /// Print collected metrics in Prometheus text format
        #[arg(long)]
        metrics: bool,
    },
    /// List the value bets placed during a walk-forward backtest
    ValueBets {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        bettor: BettorArgs,

        /// Output CSV file
        #[arg(short, long, default_value = "value_bets.csv")]
        output: String,

        /// Number of most recent bets to display
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// Fit on all settled matches, save the bettor and stake unsettled matches
    Fit {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        bettor: BettorArgs,

        /// Directory of saved bettors
        #[arg(long, default_value = "bettors")]
        store: PathBuf,

        /// Name of the saved bettor
        #[arg(long, default_value = "default")]
        name: String,

        /// Reuse a saved snapshot instead of fitting
        #[arg(long)]
        from: Option<PathBuf>,
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
    let reporter = BacktestReporter::new("backtest_results");

    match cli.command {
        Commands::Run {
            data,
            bettor,
            output,
            metrics,
        } => {
            let spec = build_spec(&bettor, &config)?;
            let (source, records) = load_records(&data, &config)?;
            reporter.print_header("WALK-FORWARD BACKTEST", &source, &spec.label(), &output);

            let report = backtest(&spec, &records, &config.backtest.walk_forward_config())?;
            reporter.print_backtest(&report);
            reporter.export_json(&report, &output)?;

            if metrics {
                let registry = BacktestMetrics::new()?;
                registry.record_report(&report);
                println!("{}", registry.render());
            }
        }
        Commands::ValueBets {
            data,
            bettor,
            output,
            limit,
        } => {
            let spec = build_spec(&bettor, &config)?;
            let (source, records) = load_records(&data, &config)?;
            reporter.print_header("VALUE BETS", &source, &spec.label(), &output);

            let bets = value_bet_backtest(&spec, &records, &config.backtest.walk_forward_config())?;
            reporter.print_value_bets(&bets, limit);
            reporter.export_bets_csv(&bets, &output)?;
        }
        Commands::Fit {
            data,
            bettor,
            store,
            name,
            from,
        } => {
            let (source, records) = load_records(&data, &config)?;
            let (settled, upcoming): (Vec<OddsOutcomeRecord>, Vec<OddsOutcomeRecord>) =
                records.into_iter().partition(|r| r.is_settled());

            let fitted = match from {
                Some(path) => FileBettorStore::load_file(&path)?,
                None => {
                    let spec = build_spec(&bettor, &config)?;
                    reporter.print_header("FIT BETTOR", &source, &spec.label(), &name);
                    let mut fitted = spec.build();
                    fitted
                        .fit(&settled)
                        .context(format!("Failed to fit on {} settled matches", settled.len()))?;
                    FileBettorStore::new(&store)?.save(&name, &fitted)?;
                    fitted
                }
            };

            info!(
                "{} fitted; staking {} unsettled matches",
                fitted.name(),
                upcoming.len()
            );
            let bets = fitted.decide(&upcoming, config.backtest.initial_cash)?;
            let placed: Vec<_> = bets.into_iter().filter(|b| b.is_value_bet()).collect();
            reporter.print_value_bets(&placed, placed.len());
        }
    }

    Ok(())
}

fn build_spec(args: &BettorArgs, config: &Config) -> Result<BettorSpec> {
    let template = BettorTemplate::from_str(&args.bettor)?;
    let spec = template
        .spec(args.alpha, config.betting.staking_policy())
        .with_betting_markets(config.betting.betting_markets.clone());
    spec.validate()?;
    Ok(spec)
}

fn load_records(args: &DataArgs, config: &Config) -> Result<(String, Vec<OddsOutcomeRecord>)> {
    let loader: Box<dyn OddsDataLoader> = match &args.data {
        Some(path) => Box::new(CsvOddsLoader::new(path)),
        None => Box::new(
            SyntheticMatchGenerator::new(args.seed)
                .with_days(args.days)
                .with_unsettled_days(args.unsettled_days),
        ),
    };
    let records = loader
        .load(&config.betting.odds_type, config.betting.drop_na_threshold)
        .context(format!("Failed to load records from {}", loader.name()))?;
    info!("Loaded {} records from {}", records.len(), loader.name());
    Ok((loader.name().to_string(), records))
}
