// Betting strategies: classifier and rule-based bettors, persistence
pub mod bettors;

// Probabilistic forecasters consumed by bettors
pub mod ml;

// Bankroll simulation, walk-forward backtesting and strategy search
pub mod optimization;
