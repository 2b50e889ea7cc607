use serde::{Deserialize, Serialize};

use super::forest::{ForestClassifier, ForestParams};
use super::softmax::{SoftmaxClassifier, SoftmaxParams};

/// Interface for probabilistic classification models.
///
/// Targets are class indices in `0..n_classes`; `predict_proba` returns one
/// row of `n_classes` probabilities per input row.
pub trait ProbabilisticClassifier: Send + Sync {
    fn fit(&mut self, features: &[Vec<f64>], targets: &[usize], n_classes: usize)
    -> Result<(), String>;

    fn predict_proba(&self, features: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, String>;

    fn is_fitted(&self) -> bool;

    /// Get model name/type
    fn name(&self) -> &str;
}

/// Serializable choice of forecaster, persisted with its fitted parameters.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Forecaster {
    Softmax(SoftmaxClassifier),
    Forest(ForestClassifier),
}

impl ProbabilisticClassifier for Forecaster {
    fn fit(
        &mut self,
        features: &[Vec<f64>],
        targets: &[usize],
        n_classes: usize,
    ) -> Result<(), String> {
        match self {
            Forecaster::Softmax(m) => m.fit(features, targets, n_classes),
            Forecaster::Forest(m) => m.fit(features, targets, n_classes),
        }
    }

    fn predict_proba(&self, features: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, String> {
        match self {
            Forecaster::Softmax(m) => m.predict_proba(features),
            Forecaster::Forest(m) => m.predict_proba(features),
        }
    }

    fn is_fitted(&self) -> bool {
        match self {
            Forecaster::Softmax(m) => m.is_fitted(),
            Forecaster::Forest(m) => m.is_fitted(),
        }
    }

    fn name(&self) -> &str {
        match self {
            Forecaster::Softmax(m) => m.name(),
            Forecaster::Forest(m) => m.name(),
        }
    }
}

/// Untrained forecaster configuration, as found in search grids.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ForecasterSpec {
    Logistic(SoftmaxParams),
    RandomForest(ForestParams),
}

impl Default for ForecasterSpec {
    fn default() -> Self {
        ForecasterSpec::Logistic(SoftmaxParams::default())
    }
}

impl ForecasterSpec {
    pub fn build(&self) -> Forecaster {
        match self {
            ForecasterSpec::Logistic(params) => Forecaster::Softmax(SoftmaxClassifier::new(*params)),
            ForecasterSpec::RandomForest(params) => {
                Forecaster::Forest(ForestClassifier::new(*params))
            }
        }
    }

    pub fn label(&self) -> String {
        match self {
            ForecasterSpec::Logistic(p) => format!("logistic(l2={})", p.l2),
            ForecasterSpec::RandomForest(p) => {
                format!("forest(trees={},depth={})", p.n_trees, p.max_depth)
            }
        }
    }
}
