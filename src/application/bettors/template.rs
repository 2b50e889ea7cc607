//! Named bettor templates selectable from the command line.

use std::fmt;
use std::str::FromStr;

use super::BettorSpec;
use crate::application::ml::{ForecasterSpec, ForestParams};
use crate::domain::betting::staking::StakingPolicy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BettorTemplate {
    Logistic,
    Forest,
    OddsComparison,
}

impl BettorTemplate {
    /// Builds the untrained [`BettorSpec`] for this template. `alpha` only applies to odds comparison.
    pub fn spec(self, alpha: f64, staking: StakingPolicy) -> BettorSpec {
        match self {
            BettorTemplate::Logistic => BettorSpec::classifier(ForecasterSpec::default(), staking),
            BettorTemplate::Forest => BettorSpec::classifier(
                ForecasterSpec::RandomForest(ForestParams::default()),
                staking,
            ),
            BettorTemplate::OddsComparison => BettorSpec::odds_comparison(alpha, staking),
        }
    }
}

impl fmt::Display for BettorTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BettorTemplate::Logistic => write!(f, "logistic"),
            BettorTemplate::Forest => write!(f, "forest"),
            BettorTemplate::OddsComparison => write!(f, "odds_comparison"),
        }
    }
}

impl FromStr for BettorTemplate {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "logistic" | "classifier" => Ok(BettorTemplate::Logistic),
            "forest" | "random_forest" => Ok(BettorTemplate::Forest),
            "odds_comparison" | "odds" => Ok(BettorTemplate::OddsComparison),
            _ => anyhow::bail!(
                "Unknown bettor '{}'. Use logistic, forest or odds_comparison",
                s
            ),
        }
    }
}

/// Parses a comma-separated list of templates, keeping the given order.
pub fn parse_templates(list: &str) -> anyhow::Result<Vec<BettorTemplate>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(BettorTemplate::from_str)
        .collect()
}
