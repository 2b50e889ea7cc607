use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::staking::StakeDecision;
use super::types::OddsOutcomeRecord;

/// Confidence bucket derived from the magnitude of the edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Low => write!(f, "LOW"),
            Confidence::Medium => write!(f, "MEDIUM"),
            Confidence::High => write!(f, "HIGH"),
        }
    }
}

/// Edge thresholds separating the confidence buckets.
///
/// `edge < medium` is LOW, `medium <= edge < high` is MEDIUM, anything
/// above is HIGH.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceThresholds {
    pub medium: f64,
    pub high: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            medium: 0.03,
            high: 0.08,
        }
    }
}

impl ConfidenceThresholds {
    pub fn classify(&self, edge: f64) -> Confidence {
        if edge >= self.high {
            Confidence::High
        } else if edge >= self.medium {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Settlement {
    /// Decided but not replayed against a result yet.
    Pending,
    Won,
    Lost,
    /// No stake placed, or the match has no known result.
    Void,
}

/// One outcome of one record, as handed from a bettor to the simulator.
///
/// Price and probability stay optional so that data-quality problems reach
/// the simulator and get counted there instead of vanishing upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetCandidate {
    pub match_id: String,
    pub home_team: String,
    pub away_team: String,
    pub kickoff: DateTime<Utc>,
    pub outcome: String,
    pub probability: Option<f64>,
    pub price: Option<f64>,
    /// Minimum edge the originating bettor requires before staking.
    pub min_edge: f64,
    result: Option<String>,
}

impl BetCandidate {
    pub fn from_record(
        record: &OddsOutcomeRecord,
        outcome: &str,
        probability: Option<f64>,
        min_edge: f64,
    ) -> Self {
        Self {
            match_id: record.match_id.clone(),
            home_team: record.home_team.clone(),
            away_team: record.away_team.clone(),
            kickoff: record.kickoff(),
            outcome: outcome.to_string(),
            probability,
            price: record.offered_odds.get(outcome).copied(),
            min_edge,
            result: record.result.clone(),
        }
    }

    /// Whether this outcome won. `None` while the match is unsettled.
    ///
    /// Only the simulator reads this, after the stake has been fixed.
    pub fn won(&self) -> Option<bool> {
        self.result.as_ref().map(|r| *r == self.outcome)
    }
}

/// An evaluated betting decision. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueBet {
    pub match_id: String,
    pub home_team: String,
    pub away_team: String,
    pub kickoff: DateTime<Utc>,
    pub outcome: String,
    pub probability: f64,
    pub price: f64,
    pub edge: f64,
    pub kelly_fraction: f64,
    pub stake: f64,
    pub potential_profit: f64,
    pub confidence: Confidence,
    pub settlement: Settlement,
    pub profit: f64,
}

impl ValueBet {
    pub(crate) fn new(
        candidate: &BetCandidate,
        probability: f64,
        price: f64,
        decision: &StakeDecision,
    ) -> Self {
        Self {
            match_id: candidate.match_id.clone(),
            home_team: candidate.home_team.clone(),
            away_team: candidate.away_team.clone(),
            kickoff: candidate.kickoff,
            outcome: candidate.outcome.clone(),
            probability,
            price,
            edge: decision.edge,
            kelly_fraction: decision.kelly_fraction,
            stake: decision.stake,
            potential_profit: decision.stake * (price - 1.0),
            confidence: decision.confidence,
            settlement: Settlement::Pending,
            profit: 0.0,
        }
    }

    pub(crate) fn settled(mut self, settlement: Settlement, profit: f64) -> Self {
        self.settlement = settlement;
        self.profit = profit;
        self
    }

    /// A value bet has a positive edge and a non-zero stake.
    pub fn is_value_bet(&self) -> bool {
        self.edge > 0.0 && self.stake > 0.0
    }

    pub fn description(&self) -> String {
        format!("{} vs {} [{}]", self.home_team, self.away_team, self.outcome)
    }
}
