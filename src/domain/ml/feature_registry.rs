use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::domain::betting::types::OddsOutcomeRecord;

/// Turns odds records into fixed-width feature vectors.
///
/// Column order is frozen at fit time and travels with a persisted bettor:
/// any change here is a breaking change for saved models.
///
/// Layout:
/// - one implied probability `1/price` per outcome, missing prices imputed
///   with the training mean
/// - the bookmaker overround (sum of implied probabilities)
/// - one-hot competition, home team and away team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureEncoder {
    outcomes: Vec<String>,
    implied_means: Vec<f64>,
    competitions: Vec<String>,
    teams: Vec<String>,
}

impl FeatureEncoder {
    /// Learns vocabularies and imputation means from the training window.
    pub fn fit(records: &[OddsOutcomeRecord], outcomes: &[String]) -> Self {
        let fallback = if outcomes.is_empty() {
            0.0
        } else {
            1.0 / outcomes.len() as f64
        };

        let implied_means = outcomes
            .iter()
            .map(|outcome| {
                let observed: Vec<f64> = records
                    .iter()
                    .filter_map(|r| implied_probability(r, outcome))
                    .collect();
                if observed.is_empty() {
                    fallback
                } else {
                    observed.iter().sum::<f64>() / observed.len() as f64
                }
            })
            .collect();

        let competitions: BTreeSet<String> =
            records.iter().map(|r| r.competition.clone()).collect();
        let teams: BTreeSet<String> = records
            .iter()
            .flat_map(|r| [r.home_team.clone(), r.away_team.clone()])
            .collect();

        Self {
            outcomes: outcomes.to_vec(),
            implied_means,
            competitions: competitions.into_iter().collect(),
            teams: teams.into_iter().collect(),
        }
    }

    pub fn width(&self) -> usize {
        self.outcomes.len() + 1 + self.competitions.len() + 2 * self.teams.len()
    }

    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .outcomes
            .iter()
            .map(|o| format!("implied_{}", o))
            .collect();
        names.push("overround".to_string());
        names.extend(self.competitions.iter().map(|c| format!("competition={}", c)));
        names.extend(self.teams.iter().map(|t| format!("home={}", t)));
        names.extend(self.teams.iter().map(|t| format!("away={}", t)));
        names
    }

    /// Encodes one record. Categories unseen during fit encode as all zeros.
    pub fn encode(&self, record: &OddsOutcomeRecord) -> Vec<f64> {
        let mut features = Vec::with_capacity(self.width());

        for (outcome, mean) in self.outcomes.iter().zip(&self.implied_means) {
            features.push(implied_probability(record, outcome).unwrap_or(*mean));
        }
        let overround: f64 = features.iter().sum();
        features.push(overround);

        one_hot(&mut features, &self.competitions, &record.competition);
        one_hot(&mut features, &self.teams, &record.home_team);
        one_hot(&mut features, &self.teams, &record.away_team);

        features
    }

    pub fn encode_all(&self, records: &[OddsOutcomeRecord]) -> Vec<Vec<f64>> {
        records.iter().map(|r| self.encode(r)).collect()
    }
}

fn implied_probability(record: &OddsOutcomeRecord, outcome: &str) -> Option<f64> {
    record
        .offered_odds
        .get(outcome)
        .filter(|p| p.is_finite() && **p > 1.0)
        .map(|p| 1.0 / p)
}

fn one_hot(features: &mut Vec<f64>, vocabulary: &[String], value: &str) {
    let start = features.len();
    features.resize(start + vocabulary.len(), 0.0);
    if let Ok(idx) = vocabulary.binary_search_by(|v| v.as_str().cmp(value)) {
        features[start + idx] = 1.0;
    }
}
