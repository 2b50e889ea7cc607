//! Backtest observability.
//!
//! Metrics are collected in a local Prometheus registry and rendered in text
//! format on demand. Nothing is served or pushed.

pub mod metrics;

pub use metrics::BacktestMetrics;
