pub mod forest;
pub mod predictor;
pub mod softmax;

pub use forest::{ForestClassifier, ForestParams};
pub use predictor::{Forecaster, ForecasterSpec, ProbabilisticClassifier};
pub use softmax::{SoftmaxClassifier, SoftmaxParams};
