use crate::domain::betting::types::OddsOutcomeRecord;
use crate::domain::betting::value_bet::BetCandidate;
use crate::domain::errors::BettingError;
use tracing::warn;

/// Centralized validator for betting data integrity.
///
/// Rejects prices and probabilities that cannot be staked on.
pub struct StrictBetValidator;

impl StrictBetValidator {
    /// Returns the usable (probability, price) pair of a candidate, or a
    /// `DataQuality` error describing why it has to be skipped.
    pub fn validate_candidate(candidate: &BetCandidate) -> Result<(f64, f64), BettingError> {
        let reject = |reason: String| BettingError::DataQuality {
            match_id: candidate.match_id.clone(),
            outcome: candidate.outcome.clone(),
            reason,
        };

        let price = match candidate.price {
            Some(price) if price.is_finite() && price > 1.0 => price,
            Some(price) => return Err(reject(format!("invalid decimal price {}", price))),
            None => return Err(reject("missing price".to_string())),
        };

        let probability = match candidate.probability {
            // certain outcomes are sized like any other; p == 0 never stakes
            Some(p) if (0.0..=1.0).contains(&p) => p,
            Some(p) => return Err(reject(format!("probability {} outside [0, 1]", p))),
            None => return Err(reject("missing probability".to_string())),
        };

        Ok((probability, price))
    }

    /// Validates the offered prices of a record. Returns true if every
    /// offered price is a finite decimal price above 1.0.
    pub fn validate_record(record: &OddsOutcomeRecord) -> bool {
        if record.offered_odds.is_empty() {
            warn!(
                "Validation FAILED: Match {} has no offered prices",
                record.match_id
            );
            return false;
        }

        for (outcome, price) in &record.offered_odds {
            if !price.is_finite() || *price <= 1.0 {
                warn!(
                    "Validation FAILED: Match {} has invalid price {} for {}",
                    record.match_id, price, outcome
                );
                return false;
            }
        }

        true
    }
}
