// Backtest performance statistics
pub mod metrics;
pub mod stats;
