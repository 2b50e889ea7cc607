// Betting domain: records, value bets, staking, bankroll
pub mod betting;

// Domain-specific error types
pub mod errors;

// Feature encoding for forecasters
pub mod ml;

// Performance tracking domain
pub mod performance;

// Port interfaces
pub mod ports;

// Data quality validation
pub mod validation;
