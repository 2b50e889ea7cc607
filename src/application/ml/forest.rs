use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_regressor::{
    RandomForestRegressor, RandomForestRegressorParameters,
};
use smartcore::linalg::basic::matrix::DenseMatrix;
use std::fmt;
use tracing::debug;

use super::predictor::ProbabilisticClassifier;

type ForestModel = RandomForestRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: u16,
    pub min_samples_split: usize,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 50,
            max_depth: 6,
            min_samples_split: 5,
        }
    }
}

/// One-vs-rest random forest: one regressor per class on 0/1 indicator
/// targets, scores later normalised into probabilities.
#[derive(Serialize, Deserialize)]
enum ClassScorer {
    /// The class is always or never observed in training.
    Constant(f64),
    Model(ForestModel),
}

impl fmt::Debug for ClassScorer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassScorer::Constant(v) => write!(f, "Constant({})", v),
            ClassScorer::Model(_) => write!(f, "RandomForestRegressor"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ForestClassifier {
    params: ForestParams,
    scorers: Vec<ClassScorer>,
}

impl ForestClassifier {
    pub fn new(params: ForestParams) -> Self {
        Self {
            params,
            scorers: Vec::new(),
        }
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }
}

impl ProbabilisticClassifier for ForestClassifier {
    fn fit(
        &mut self,
        features: &[Vec<f64>],
        targets: &[usize],
        n_classes: usize,
    ) -> Result<(), String> {
        if features.is_empty() || features.len() != targets.len() {
            return Err(format!(
                "Need matching non-empty features/targets, got {}/{}",
                features.len(),
                targets.len()
            ));
        }

        let x_matrix = DenseMatrix::from_2d_vec(&features.to_vec())
            .map_err(|e| format!("Matrix error: {}", e))?;

        let mut scorers = Vec::with_capacity(n_classes);
        for class in 0..n_classes {
            let y: Vec<f64> = targets
                .iter()
                .map(|t| if *t == class { 1.0 } else { 0.0 })
                .collect();

            let first = y[0];
            if y.iter().all(|v| *v == first) {
                scorers.push(ClassScorer::Constant(first));
                continue;
            }

            let params = RandomForestRegressorParameters::default()
                .with_n_trees(self.params.n_trees)
                .with_max_depth(self.params.max_depth)
                .with_min_samples_split(self.params.min_samples_split);
            let model = RandomForestRegressor::fit(&x_matrix, &y, params)
                .map_err(|e| format!("Training failed for class {}: {}", class, e))?;
            scorers.push(ClassScorer::Model(model));
        }

        debug!(
            "ForestClassifier: fitted {} one-vs-rest forests on {} rows",
            n_classes,
            features.len()
        );
        self.scorers = scorers;
        Ok(())
    }

    fn predict_proba(&self, features: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, String> {
        if self.scorers.is_empty() {
            return Err("ForestClassifier is not fitted".to_string());
        }
        if features.is_empty() {
            return Ok(Vec::new());
        }

        let input_matrix = DenseMatrix::from_2d_vec(&features.to_vec())
            .map_err(|e| format!("Matrix creation failed: {}", e))?;

        let mut columns = Vec::with_capacity(self.scorers.len());
        for scorer in &self.scorers {
            let scores = match scorer {
                ClassScorer::Constant(v) => vec![*v; features.len()],
                ClassScorer::Model(model) => model
                    .predict(&input_matrix)
                    .map_err(|e| format!("Prediction failed: {}", e))?,
            };
            columns.push(scores);
        }

        let rows = (0..features.len())
            .map(|i| {
                let raw: Vec<f64> = columns.iter().map(|c| c[i].clamp(0.0, 1.0)).collect();
                let sum: f64 = raw.iter().sum();
                if sum > 1e-12 {
                    raw.iter().map(|v| v / sum).collect()
                } else {
                    vec![1.0 / raw.len() as f64; raw.len()]
                }
            })
            .collect();
        Ok(rows)
    }

    fn is_fitted(&self) -> bool {
        !self.scorers.is_empty()
    }

    fn name(&self) -> &str {
        "SmartCore Random Forest"
    }
}
