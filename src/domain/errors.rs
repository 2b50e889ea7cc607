use thiserror::Error;

/// Errors raised by the betting evaluation and backtesting engine.
#[derive(Debug, Error)]
pub enum BettingError {
    /// A record or candidate is missing a usable price or probability.
    /// Recovered locally: the event is skipped and counted.
    #[error("Data quality issue for {match_id} ({outcome}): {reason}")]
    DataQuality {
        match_id: String,
        outcome: String,
        reason: String,
    },

    #[error("{bettor} must be fitted before calling {operation}")]
    NotFitted {
        bettor: String,
        operation: &'static str,
    },

    #[error("Insufficient training data: {available} usable records, need at least {required}")]
    InsufficientData { available: usize, required: usize },

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Invalid configuration for {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("Forecaster error: {0}")]
    Model(String),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Unsupported snapshot format v{found}, this build reads up to v{supported}")]
    UnsupportedFormat { found: u32, supported: u32 },

    #[error("Strategy search produced no successful configuration ({failed} failed)")]
    SearchExhausted { failed: usize },
}

impl BettingError {
    pub fn invalid_config(field: &str, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    /// Errors that exclude a single walk-forward fold instead of halting the run.
    pub fn is_fold_recoverable(&self) -> bool {
        matches!(self, Self::InsufficientData { .. })
    }
}
