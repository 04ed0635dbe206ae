// Trainable two-class scorer behind the learned arms

use rand::Rng;
use serde::{Deserialize, Serialize};

pub type Features = [f64; 2];

pub trait Estimator: Send {
    /// Class scores for `features`; index 1 is the "worth fetching" class.
    fn score(&self, features: Features) -> [f64; 2];

    /// One gradient step of size `step` towards `label` (0 or 1).
    fn update(&mut self, features: Features, label: usize, step: f64);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticEstimator {
    weights: [[f64; 2]; 2],
    bias: [f64; 2],
}

impl LogisticEstimator {
    /// Weights drawn uniformly from `±1/√fan_in`.
    pub fn new<R: Rng>(rng: &mut R) -> Self {
        let bound = 1.0 / 2f64.sqrt();
        let mut draw = || rng.random_range(-bound..bound);
        Self {
            weights: [[draw(), draw()], [draw(), draw()]],
            bias: [draw(), draw()],
        }
    }

    pub fn zeroed() -> Self {
        Self {
            weights: [[0.0; 2]; 2],
            bias: [0.0; 2],
        }
    }

    fn logits(&self, features: Features) -> [f64; 2] {
        let mut out = self.bias;
        for (class, row) in self.weights.iter().enumerate() {
            out[class] += row[0] * features[0] + row[1] * features[1];
        }
        out
    }
}

impl Estimator for LogisticEstimator {
    fn score(&self, features: Features) -> [f64; 2] {
        softmax(self.logits(features))
    }

    fn update(&mut self, features: Features, label: usize, step: f64) {
        let probabilities = self.score(features);
        for class in 0..2 {
            let target = if class == label { 1.0 } else { 0.0 };
            let gradient = probabilities[class] - target;
            self.weights[class][0] -= step * gradient * features[0];
            self.weights[class][1] -= step * gradient * features[1];
            self.bias[class] -= step * gradient;
        }
    }
}

fn softmax(logits: [f64; 2]) -> [f64; 2] {
    let max = logits[0].max(logits[1]);
    let exp = [(logits[0] - max).exp(), (logits[1] - max).exp()];
    let total = exp[0] + exp[1];
    [exp[0] / total, exp[1] / total]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_zeroed_is_undecided() {
        let estimator = LogisticEstimator::zeroed();
        assert_eq!(estimator.score([0.3, 0.7]), [0.5, 0.5]);
    }

    #[test]
    fn test_scores_are_probabilities() {
        let mut rng = StdRng::seed_from_u64(3);
        let estimator = LogisticEstimator::new(&mut rng);
        let [a, b] = estimator.score([0.9, 0.1]);
        assert!(a > 0.0 && b > 0.0);
        assert!((a + b - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_update_moves_towards_label() {
        let mut estimator = LogisticEstimator::zeroed();
        let features = [0.8, 0.2];

        for _ in 0..50 {
            estimator.update(features, 1, 0.5);
        }
        assert!(estimator.score(features)[1] > 0.9);

        for _ in 0..200 {
            estimator.update(features, 0, 0.5);
        }
        assert!(estimator.score(features)[0] > 0.9);
    }

    #[test]
    fn test_zero_step_is_a_no_op() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut estimator = LogisticEstimator::new(&mut rng);
        let before = estimator.clone();
        estimator.update([0.5, 0.5], 1, 0.0);
        assert_eq!(estimator, before);
    }

    #[test]
    fn test_softmax_is_stable_for_large_logits() {
        let [a, b] = softmax([1000.0, 1001.0]);
        assert!(a.is_finite() && b.is_finite());
        assert!(b > a);
    }
}
