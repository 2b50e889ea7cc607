//! Bettors: forecaster + staking policy, behind one fit/predict/decide contract.

pub mod classifier;
pub mod odds_comparison;
pub mod persistence;
pub mod template;

pub use classifier::ClassifierBettor;
pub use odds_comparison::OddsComparisonBettor;
pub use persistence::{
    BETTOR_FORMAT_VERSION, BettorSnapshot, load_bettor, load_snapshot, save_bettor,
};
pub use template::{BettorTemplate, parse_templates};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::application::ml::ForecasterSpec;
use crate::domain::betting::types::{OddsOutcomeRecord, OutcomeProbabilities};
use crate::domain::betting::value_bet::{BetCandidate, ValueBet};
use crate::domain::betting::StakingPolicy;
use crate::domain::errors::BettingError;
use crate::domain::validation::data_quality::StrictBetValidator;

/// Common contract of every betting strategy.
///
/// Lifecycle: created untrained, `fit` on a training window, then used
/// read-only for `predict`/`decide` on later records.
pub trait Bettor: Send + Sync {
    fn name(&self) -> &str;

    /// Fits the bettor. Fails with `InsufficientData` when the window holds
    /// no usable record. Refitting replaces any previous state.
    fn fit(&mut self, records: &[OddsOutcomeRecord]) -> Result<(), BettingError>;

    fn is_fitted(&self) -> bool;

    /// Per-record, per-outcome probabilities. Fails with `NotFitted` before `fit`.
    fn predict(
        &self,
        records: &[OddsOutcomeRecord],
    ) -> Result<Vec<OutcomeProbabilities>, BettingError>;

    fn staking(&self) -> &StakingPolicy;

    /// Outcomes this bettor is allowed to stake on; `None` means all.
    fn betting_markets(&self) -> Option<&[String]>;

    /// Edge that has to be exceeded before a stake is placed.
    fn min_edge(&self) -> f64 {
        0.0
    }

    /// Pairs every stakeable outcome of every record with its prediction.
    ///
    /// Outcomes without a price or without a probability are kept so that
    /// the simulator can count them as data-quality skips.
    fn candidates(
        &self,
        records: &[OddsOutcomeRecord],
    ) -> Result<Vec<BetCandidate>, BettingError> {
        let probabilities = self.predict(records)?;
        let markets = self.betting_markets();

        let mut candidates = Vec::new();
        for (record, probs) in records.iter().zip(&probabilities) {
            let mut outcomes: Vec<&String> = probs.keys().collect();
            for outcome in record.offered_odds.keys() {
                if !probs.contains_key(outcome) {
                    outcomes.push(outcome);
                }
            }
            outcomes.sort();

            for outcome in outcomes {
                if let Some(markets) = markets
                    && !markets.iter().any(|m| m == outcome)
                {
                    continue;
                }
                candidates.push(BetCandidate::from_record(
                    record,
                    outcome,
                    probs.get(outcome).copied(),
                    self.min_edge(),
                ));
            }
        }
        Ok(candidates)
    }

    /// Sizes every valid candidate against `bankroll`.
    ///
    /// Does not touch any bankroll state; invalid candidates are logged and
    /// left out.
    fn decide(
        &self,
        records: &[OddsOutcomeRecord],
        bankroll: f64,
    ) -> Result<Vec<ValueBet>, BettingError> {
        let policy = self.staking();
        let mut bets = Vec::new();
        for candidate in self.candidates(records)? {
            match StrictBetValidator::validate_candidate(&candidate) {
                Ok((probability, price)) => {
                    let decision = policy
                        .size(probability, price, bankroll)
                        .require_edge(candidate.min_edge);
                    bets.push(ValueBet::new(&candidate, probability, price, &decision));
                }
                Err(e) => warn!("{}: skipping candidate: {}", self.name(), e),
            }
        }
        Ok(bets)
    }
}

/// Closed set of bettor variants, dispatched through [`Bettor`].
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BettorKind {
    Classifier(ClassifierBettor),
    OddsComparison(OddsComparisonBettor),
}

impl Bettor for BettorKind {
    fn name(&self) -> &str {
        match self {
            BettorKind::Classifier(b) => b.name(),
            BettorKind::OddsComparison(b) => b.name(),
        }
    }

    fn fit(&mut self, records: &[OddsOutcomeRecord]) -> Result<(), BettingError> {
        match self {
            BettorKind::Classifier(b) => b.fit(records),
            BettorKind::OddsComparison(b) => b.fit(records),
        }
    }

    fn is_fitted(&self) -> bool {
        match self {
            BettorKind::Classifier(b) => b.is_fitted(),
            BettorKind::OddsComparison(b) => b.is_fitted(),
        }
    }

    fn predict(
        &self,
        records: &[OddsOutcomeRecord],
    ) -> Result<Vec<OutcomeProbabilities>, BettingError> {
        match self {
            BettorKind::Classifier(b) => b.predict(records),
            BettorKind::OddsComparison(b) => b.predict(records),
        }
    }

    fn staking(&self) -> &StakingPolicy {
        match self {
            BettorKind::Classifier(b) => b.staking(),
            BettorKind::OddsComparison(b) => b.staking(),
        }
    }

    fn betting_markets(&self) -> Option<&[String]> {
        match self {
            BettorKind::Classifier(b) => b.betting_markets(),
            BettorKind::OddsComparison(b) => b.betting_markets(),
        }
    }

    fn min_edge(&self) -> f64 {
        match self {
            BettorKind::Classifier(b) => b.min_edge(),
            BettorKind::OddsComparison(b) => b.min_edge(),
        }
    }
}

/// Untrained bettor configuration. Every walk-forward fold builds a fresh
/// bettor from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BettorSpec {
    Classifier {
        #[serde(default)]
        forecaster: ForecasterSpec,
        #[serde(default)]
        staking: StakingPolicy,
        #[serde(default)]
        betting_markets: Option<Vec<String>>,
    },
    OddsComparison {
        #[serde(default)]
        reference_bookmakers: Vec<String>,
        #[serde(default)]
        alpha: f64,
        #[serde(default)]
        staking: StakingPolicy,
        #[serde(default)]
        betting_markets: Option<Vec<String>>,
    },
}

impl BettorSpec {
    pub fn classifier(forecaster: ForecasterSpec, staking: StakingPolicy) -> Self {
        BettorSpec::Classifier {
            forecaster,
            staking,
            betting_markets: None,
        }
    }

    pub fn odds_comparison(alpha: f64, staking: StakingPolicy) -> Self {
        BettorSpec::OddsComparison {
            reference_bookmakers: Vec::new(),
            alpha,
            staking,
            betting_markets: None,
        }
    }

    pub fn build(&self) -> BettorKind {
        match self {
            BettorSpec::Classifier {
                forecaster,
                staking,
                betting_markets,
            } => BettorKind::Classifier(
                ClassifierBettor::new(*forecaster, *staking)
                    .with_betting_markets(betting_markets.clone()),
            ),
            BettorSpec::OddsComparison {
                reference_bookmakers,
                alpha,
                staking,
                betting_markets,
            } => BettorKind::OddsComparison(
                OddsComparisonBettor::new(*alpha, *staking)
                    .with_reference_bookmakers(reference_bookmakers.clone())
                    .with_betting_markets(betting_markets.clone()),
            ),
        }
    }

    pub fn staking(&self) -> &StakingPolicy {
        match self {
            BettorSpec::Classifier { staking, .. } | BettorSpec::OddsComparison { staking, .. } => {
                staking
            }
        }
    }

    pub fn with_staking(mut self, policy: StakingPolicy) -> Self {
        match &mut self {
            BettorSpec::Classifier { staking, .. } | BettorSpec::OddsComparison { staking, .. } => {
                *staking = policy
            }
        }
        self
    }

    pub fn with_betting_markets(mut self, markets: Option<Vec<String>>) -> Self {
        match &mut self {
            BettorSpec::Classifier {
                betting_markets, ..
            }
            | BettorSpec::OddsComparison {
                betting_markets, ..
            } => *betting_markets = markets,
        }
        self
    }

    pub fn validate(&self) -> Result<(), BettingError> {
        self.staking().validate()?;
        if let BettorSpec::OddsComparison { alpha, .. } = self
            && (!alpha.is_finite() || *alpha < 0.0)
        {
            return Err(BettingError::invalid_config(
                "alpha",
                format!("must be a non-negative edge margin, got {}", alpha),
            ));
        }
        Ok(())
    }

    /// Short human-readable description for reports.
    pub fn label(&self) -> String {
        let staking = self.staking();
        let sizing = match staking.kelly_fraction() {
            Some(k) => format!("kelly={}", k),
            None => "fixed".to_string(),
        };
        let model = match self {
            BettorSpec::Classifier { forecaster, .. } => forecaster.label(),
            BettorSpec::OddsComparison { alpha, .. } => format!("odds_comparison(alpha={})", alpha),
        };
        format!(
            "{} {} pct={} abs={}",
            model, sizing, staking.limits.max_stake_pct, staking.limits.max_stake_abs
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::betting::types::{AWAY_WIN, DRAW, HOME_WIN};
    use crate::domain::betting::StakeLimits;
    use chrono::{TimeZone, Utc};

    /// Bettor with hard-coded probabilities for exercising the default methods.
    struct FixedBettor {
        probs: OutcomeProbabilities,
        staking: StakingPolicy,
        markets: Option<Vec<String>>,
    }

    impl Bettor for FixedBettor {
        fn name(&self) -> &str {
            "FixedBettor"
        }
        fn fit(&mut self, _records: &[OddsOutcomeRecord]) -> Result<(), BettingError> {
            Ok(())
        }
        fn is_fitted(&self) -> bool {
            true
        }
        fn predict(
            &self,
            records: &[OddsOutcomeRecord],
        ) -> Result<Vec<OutcomeProbabilities>, BettingError> {
            Ok(vec![self.probs.clone(); records.len()])
        }
        fn staking(&self) -> &StakingPolicy {
            &self.staking
        }
        fn betting_markets(&self) -> Option<&[String]> {
            self.markets.as_deref()
        }
    }

    fn record() -> OddsOutcomeRecord {
        OddsOutcomeRecord::new(
            "m1",
            "Premier League",
            "Arsenal",
            "Chelsea",
            Utc.with_ymd_and_hms(2024, 2, 3, 12, 30, 0).unwrap(),
        )
        .with_offered_odds(HOME_WIN, 2.10)
        .with_offered_odds(DRAW, 3.50)
        .with_offered_odds(AWAY_WIN, 2.00)
    }

    fn bettor(markets: Option<Vec<String>>) -> FixedBettor {
        let probs = [(HOME_WIN, 0.55), (DRAW, 0.25), (AWAY_WIN, 0.20)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        FixedBettor {
            probs,
            staking: StakingPolicy::kelly(
                0.25,
                StakeLimits {
                    max_stake_pct: 1.0,
                    max_stake_abs: 1e6,
                },
            ),
            markets,
        }
    }

    #[test]
    fn test_decide_sizes_every_outcome() {
        let bets = bettor(None).decide(&[record()], 1000.0).unwrap();
        assert_eq!(bets.len(), 3);

        let home = bets.iter().find(|b| b.outcome == HOME_WIN).unwrap();
        assert_eq!(home.stake, 35.22);
        assert!(home.is_value_bet());

        let away = bets.iter().find(|b| b.outcome == AWAY_WIN).unwrap();
        assert!((away.edge + 0.6).abs() < 1e-12);
        assert_eq!(away.stake, 0.0);
        assert!(!away.is_value_bet());
    }

    #[test]
    fn test_betting_markets_filter() {
        let bets = bettor(Some(vec![DRAW.to_string()]))
            .decide(&[record()], 1000.0)
            .unwrap();
        assert_eq!(bets.len(), 1);
        assert_eq!(bets[0].outcome, DRAW);
    }

    #[test]
    fn test_unpriced_outcome_is_a_candidate_but_not_a_bet() {
        let mut b = bettor(None);
        b.probs.insert("over_2.5".to_string(), 0.6);

        let candidates = b.candidates(&[record()]).unwrap();
        let over = candidates.iter().find(|c| c.outcome == "over_2.5").unwrap();
        assert_eq!(over.price, None);

        let bets = b.decide(&[record()], 1000.0).unwrap();
        assert!(bets.iter().all(|bet| bet.outcome != "over_2.5"));
    }

    #[test]
    fn test_spec_with_staking_replaces_policy() {
        let spec = BettorSpec::odds_comparison(0.02, StakingPolicy::default())
            .with_staking(StakingPolicy::fixed(10.0, StakeLimits::default()));
        assert_eq!(spec.staking().kelly_fraction(), None);
        assert!(spec.validate().is_ok());

        let bad = BettorSpec::odds_comparison(-0.1, StakingPolicy::default());
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_spec_toml_defaults() {
        let spec: BettorSpec = toml::from_str(r#"type = "odds_comparison""#).unwrap();
        assert_eq!(spec, BettorSpec::odds_comparison(0.0, StakingPolicy::default()));
    }
}
