use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use super::Bettor;
use crate::domain::betting::StakingPolicy;
use crate::domain::betting::types::{OddsOutcomeRecord, OutcomeProbabilities};
use crate::domain::errors::BettingError;

/// Rule-based bettor: the "fair" probability of an outcome is the
/// normalised inverse of its mean reference price. A stake is placed when
/// the offered price beats that probability by more than `alpha`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsComparisonBettor {
    /// Bookmakers used as the reference; empty means every quote.
    reference_bookmakers: Vec<String>,
    alpha: f64,
    staking: StakingPolicy,
    betting_markets: Option<Vec<String>>,
    fitted: bool,
}

impl OddsComparisonBettor {
    pub fn new(alpha: f64, staking: StakingPolicy) -> Self {
        Self {
            reference_bookmakers: Vec::new(),
            alpha,
            staking,
            betting_markets: None,
            fitted: false,
        }
    }

    pub fn with_reference_bookmakers(mut self, bookmakers: Vec<String>) -> Self {
        self.reference_bookmakers = bookmakers;
        self
    }

    pub fn with_betting_markets(mut self, markets: Option<Vec<String>>) -> Self {
        self.betting_markets = markets;
        self
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Mean reference price per outcome. Falls back to the offered prices
    /// when the record carries no matching quote.
    fn reference_prices(&self, record: &OddsOutcomeRecord) -> BTreeMap<String, f64> {
        let mut sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        for quote in record.quotes.iter().filter(|q| {
            self.reference_bookmakers.is_empty() || self.reference_bookmakers.contains(&q.bookmaker)
        }) {
            for (outcome, price) in &quote.prices {
                if let Some(price) = price
                    && price.is_finite()
                    && *price > 1.0
                {
                    let entry = sums.entry(outcome.clone()).or_insert((0.0, 0));
                    entry.0 += price;
                    entry.1 += 1;
                }
            }
        }

        if sums.is_empty() {
            return record
                .offered_odds
                .iter()
                .filter(|(_, p)| p.is_finite() && **p > 1.0)
                .map(|(o, p)| (o.clone(), *p))
                .collect();
        }
        sums.into_iter()
            .map(|(outcome, (sum, n))| (outcome, sum / n as f64))
            .collect()
    }

    /// Empty when the reference does not price every offered outcome, so
    /// those candidates surface as data-quality skips.
    fn fair_probabilities(&self, record: &OddsOutcomeRecord) -> OutcomeProbabilities {
        let reference = self.reference_prices(record);
        if let Some(outcome) = record
            .offered_odds
            .keys()
            .find(|o| !reference.contains_key(*o))
        {
            debug!(
                "OddsComparisonBettor: match {} has no reference price for {}",
                record.match_id, outcome
            );
            return OutcomeProbabilities::new();
        }

        let implied: BTreeMap<String, f64> = reference
            .into_iter()
            .map(|(o, p)| (o, 1.0 / p))
            .collect();
        // removes the bookmaker overround
        let total: f64 = implied.values().sum();
        if total <= 0.0 {
            return OutcomeProbabilities::new();
        }
        implied.into_iter().map(|(o, p)| (o, p / total)).collect()
    }
}

impl Bettor for OddsComparisonBettor {
    fn name(&self) -> &str {
        "OddsComparisonBettor"
    }

    fn fit(&mut self, records: &[OddsOutcomeRecord]) -> Result<(), BettingError> {
        if records.is_empty() {
            return Err(BettingError::InsufficientData {
                available: 0,
                required: 1,
            });
        }
        info!(
            "OddsComparisonBettor: ready (alpha={}, {} training records)",
            self.alpha,
            records.len()
        );
        self.fitted = true;
        Ok(())
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }

    fn predict(
        &self,
        records: &[OddsOutcomeRecord],
    ) -> Result<Vec<OutcomeProbabilities>, BettingError> {
        if !self.fitted {
            return Err(BettingError::NotFitted {
                bettor: self.name().to_string(),
                operation: "predict",
            });
        }
        Ok(records.iter().map(|r| self.fair_probabilities(r)).collect())
    }

    fn staking(&self) -> &StakingPolicy {
        &self.staking
    }

    fn betting_markets(&self) -> Option<&[String]> {
        self.betting_markets.as_deref()
    }

    fn min_edge(&self) -> f64 {
        self.alpha
    }
}
