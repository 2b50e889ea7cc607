use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

use super::Bettor;
use crate::application::ml::{Forecaster, ForecasterSpec, ProbabilisticClassifier};
use crate::domain::betting::StakingPolicy;
use crate::domain::betting::types::{OddsOutcomeRecord, OutcomeProbabilities};
use crate::domain::errors::BettingError;
use crate::domain::ml::feature_registry::FeatureEncoder;

#[derive(Debug, Serialize, Deserialize)]
struct FittedClassifier {
    classes: Vec<String>,
    encoder: FeatureEncoder,
    forecaster: Forecaster,
}

/// Bettor backed by a probabilistic classifier trained on settled matches.
#[derive(Debug, Serialize, Deserialize)]
pub struct ClassifierBettor {
    forecaster: ForecasterSpec,
    staking: StakingPolicy,
    betting_markets: Option<Vec<String>>,
    fitted: Option<FittedClassifier>,
}

impl ClassifierBettor {
    pub fn new(forecaster: ForecasterSpec, staking: StakingPolicy) -> Self {
        Self {
            forecaster,
            staking,
            betting_markets: None,
            fitted: None,
        }
    }

    pub fn with_betting_markets(mut self, markets: Option<Vec<String>>) -> Self {
        self.betting_markets = markets;
        self
    }

    /// Outcome labels learned at fit time, in probability column order.
    pub fn classes(&self) -> Option<&[String]> {
        self.fitted.as_ref().map(|f| f.classes.as_slice())
    }
}

/// Clips raw model output into [0, 1] and renormalises; a degenerate row
/// becomes uniform.
fn normalise(raw: &[f64]) -> Vec<f64> {
    let clipped: Vec<f64> = raw
        .iter()
        .map(|p| if p.is_finite() { p.clamp(0.0, 1.0) } else { 0.0 })
        .collect();
    let sum: f64 = clipped.iter().sum();
    if sum > 1e-12 {
        clipped.iter().map(|p| p / sum).collect()
    } else {
        vec![1.0 / clipped.len().max(1) as f64; clipped.len()]
    }
}

impl Bettor for ClassifierBettor {
    fn name(&self) -> &str {
        "ClassifierBettor"
    }

    fn fit(&mut self, records: &[OddsOutcomeRecord]) -> Result<(), BettingError> {
        let usable: Vec<OddsOutcomeRecord> = records
            .iter()
            .filter(|r| r.is_settled())
            .cloned()
            .collect();
        if usable.is_empty() {
            return Err(BettingError::InsufficientData {
                available: 0,
                required: 1,
            });
        }

        let classes: Vec<String> = usable
            .iter()
            .flat_map(|r| r.outcome_labels())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let encoder = FeatureEncoder::fit(&usable, &classes);
        let features = encoder.encode_all(&usable);
        let targets: Vec<usize> = usable
            .iter()
            .filter_map(|r| r.result.as_ref())
            .filter_map(|result| classes.iter().position(|c| c == result))
            .collect();

        let mut forecaster = self.forecaster.build();
        forecaster
            .fit(&features, &targets, classes.len())
            .map_err(BettingError::Model)?;

        info!(
            "ClassifierBettor: fitted {} on {} settled records, {} outcomes",
            forecaster.name(),
            usable.len(),
            classes.len()
        );

        self.fitted = Some(FittedClassifier {
            classes,
            encoder,
            forecaster,
        });
        Ok(())
    }

    fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    fn predict(
        &self,
        records: &[OddsOutcomeRecord],
    ) -> Result<Vec<OutcomeProbabilities>, BettingError> {
        let fitted = self.fitted.as_ref().ok_or_else(|| BettingError::NotFitted {
            bettor: self.name().to_string(),
            operation: "predict",
        })?;
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let features = fitted.encoder.encode_all(records);
        let raw = fitted
            .forecaster
            .predict_proba(&features)
            .map_err(BettingError::Model)?;
        if raw.len() != records.len() {
            return Err(BettingError::Model(format!(
                "forecaster returned {} rows for {} records",
                raw.len(),
                records.len()
            )));
        }

        debug!("ClassifierBettor: predicted {} records", records.len());

        Ok(raw
            .iter()
            .map(|row| {
                fitted
                    .classes
                    .iter()
                    .cloned()
                    .zip(normalise(row))
                    .collect()
            })
            .collect())
    }

    fn staking(&self) -> &StakingPolicy {
        &self.staking
    }

    fn betting_markets(&self) -> Option<&[String]> {
        self.betting_markets.as_deref()
    }
}
