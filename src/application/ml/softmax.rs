//! Multinomial logistic regression
//!
//! Full-batch gradient descent on standardised features with L2 penalty.
//! Weights start at zero and the update order is fixed, so fitting the same
//! data twice yields bit-identical parameters.

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::predictor::ProbabilisticClassifier;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxParams {
    pub learning_rate: f64,
    pub epochs: usize,
    pub l2: f64,
}

impl Default for SoftmaxParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            epochs: 300,
            l2: 1e-3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SoftmaxState {
    means: Array1<f64>,
    scales: Array1<f64>,
    weights: Array2<f64>,
    bias: Array1<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxClassifier {
    params: SoftmaxParams,
    state: Option<SoftmaxState>,
}

impl SoftmaxClassifier {
    pub fn new(params: SoftmaxParams) -> Self {
        Self {
            params,
            state: None,
        }
    }

    pub fn params(&self) -> &SoftmaxParams {
        &self.params
    }
}

fn to_matrix(features: &[Vec<f64>], width: Option<usize>) -> Result<Array2<f64>, String> {
    let n = features.len();
    let d = width.unwrap_or_else(|| features.first().map(|r| r.len()).unwrap_or(0));
    if let Some(row) = features.iter().find(|r| r.len() != d) {
        return Err(format!("Ragged feature matrix: expected {} columns, got {}", d, row.len()));
    }
    let flat: Vec<f64> = features.iter().flatten().copied().collect();
    Array2::from_shape_vec((n, d), flat).map_err(|e| format!("Matrix creation failed: {}", e))
}

fn softmax_rows(logits: &mut Array2<f64>) {
    for mut row in logits.rows_mut() {
        let max = row.fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        row.mapv_inplace(|v| (v - max).exp());
        let sum = row.sum();
        if sum > 0.0 {
            row.mapv_inplace(|v| v / sum);
        }
    }
}

impl ProbabilisticClassifier for SoftmaxClassifier {
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
        if let Some(t) = targets.iter().find(|t| **t >= n_classes) {
            return Err(format!("Target {} outside {} classes", t, n_classes));
        }

        let x = to_matrix(features, None)?;
        let (n, d) = x.dim();

        let means = x
            .mean_axis(Axis(0))
            .ok_or_else(|| "Cannot standardise empty matrix".to_string())?;
        let scales = x
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > 1e-12 { s } else { 1.0 });
        let xs = (&x - &means) / &scales;

        let mut onehot = Array2::<f64>::zeros((n, n_classes));
        for (i, t) in targets.iter().enumerate() {
            onehot[[i, *t]] = 1.0;
        }

        let mut weights = Array2::<f64>::zeros((d, n_classes));
        let mut bias = Array1::<f64>::zeros(n_classes);
        let lr = self.params.learning_rate;
        let n_f = n as f64;

        for _ in 0..self.params.epochs {
            let mut probs = xs.dot(&weights) + &bias;
            softmax_rows(&mut probs);
            let residual = probs - &onehot;

            let grad_w = xs.t().dot(&residual) / n_f + &weights * self.params.l2;
            let grad_b = residual.sum_axis(Axis(0)) / n_f;

            weights = weights - grad_w * lr;
            bias = bias - grad_b * lr;
        }

        debug!(
            "SoftmaxClassifier: fitted {} rows x {} features into {} classes",
            n, d, n_classes
        );

        self.state = Some(SoftmaxState {
            means,
            scales,
            weights,
            bias,
        });
        Ok(())
    }

    fn predict_proba(&self, features: &[Vec<f64>]) -> Result<Vec<Vec<f64>>, String> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| "SoftmaxClassifier is not fitted".to_string())?;

        let x = to_matrix(features, Some(state.means.len()))?;
        let xs = (&x - &state.means) / &state.scales;
        let mut probs = xs.dot(&state.weights) + &state.bias;
        softmax_rows(&mut probs);

        Ok(probs.rows().into_iter().map(|r| r.to_vec()).collect())
    }

    fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    fn name(&self) -> &str {
        "Softmax Logistic Regression"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn separable() -> (Vec<Vec<f64>>, Vec<usize>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..30 {
            let v = i as f64 / 10.0;
            x.push(vec![v, 1.0]);
            y.push(if v < 1.0 {
                0
            } else if v < 2.0 {
                1
            } else {
                2
            });
        }
        (x, y)
    }

    #[test]
    fn test_probabilities_sum_to_one() {
        let (x, y) = separable();
        let mut model = SoftmaxClassifier::new(SoftmaxParams::default());
        model.fit(&x, &y, 3).unwrap();

        let probs = model.predict_proba(&x).unwrap();
        assert_eq!(probs.len(), x.len());
        for row in &probs {
            assert_eq!(row.len(), 3);
            assert!((row.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
        // extremes are classified correctly
        assert!(probs[0][0] > probs[0][2]);
        assert!(probs[29][2] > probs[29][0]);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (x, y) = separable();
        let mut a = SoftmaxClassifier::new(SoftmaxParams::default());
        let mut b = SoftmaxClassifier::new(SoftmaxParams::default());
        a.fit(&x, &y, 3).unwrap();
        b.fit(&x, &y, 3).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_predict_before_fit_fails() {
        let model = SoftmaxClassifier::new(SoftmaxParams::default());
        assert!(!model.is_fitted());
        assert!(model.predict_proba(&[vec![1.0]]).is_err());
    }

    #[test]
    fn test_rejects_wrong_width() {
        let (x, y) = separable();
        let mut model = SoftmaxClassifier::new(SoftmaxParams::default());
        model.fit(&x, &y, 3).unwrap();
        assert!(model.predict_proba(&[vec![1.0, 2.0, 3.0]]).is_err());
    }
}
