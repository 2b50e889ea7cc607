// Bankroll simulation, walk-forward backtesting and strategy search
pub mod optimizer;
pub mod reporting;
pub mod simulator;
pub mod walk_forward;

pub use optimizer::{Objective, ParameterGrid, SearchOutcome, StrategySearch};
pub use simulator::{BankrollSimulator, SimulationResult};
pub use walk_forward::{
    BacktestReport, FoldMode, FoldOutcome, FoldReport, WalkForwardConfig, backtest,
    value_bet_backtest,
};
