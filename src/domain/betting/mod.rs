// Betting domain: records, decisions, stake sizing and bankroll state
pub mod bankroll;
pub mod staking;
pub mod types;
pub mod value_bet;

pub use bankroll::{BankrollState, SimulationPhase};
pub use staking::{SizingMode, StakeDecision, StakeLimits, StakingPolicy};
pub use types::{BookmakerQuote, OddsOutcomeRecord, OddsType, OutcomeProbabilities};
pub use value_bet::{BetCandidate, Confidence, ConfidenceThresholds, Settlement, ValueBet};
