// Arms: estimate, visit and learn from the reward of a page

use crate::estimator::{Estimator, Features};
use crate::graph::{Axis, GraphLog, NodeProps};
use crate::oracle::RelevanceOracle;
use bandwalk_scanner::{url_key, SizeProbe};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Size in bytes that counts as a "full" page.
pub const MAX_SIZE: u64 = 1_000_000;
pub const LEARNING_RATE: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArmParams {
    pub max_size: u64,
    pub lr: f64,
}

impl Default for ArmParams {
    fn default() -> Self {
        Self {
            max_size: MAX_SIZE,
            lr: LEARNING_RATE,
        }
    }
}

/// Ground truth observed for a downloaded page.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Metric {
    pub size: u64,
}

/// Model state shared by the learned arms.
pub struct Scorer {
    estimator: Box<dyn Estimator>,
    probe: Arc<dyn SizeProbe>,
    params: ArmParams,
    /// Features of the last estimate, reused when the same page is acted on.
    scored: Option<(String, Features)>,
    /// Features the last action was based on, consumed by `train`.
    pending: Option<(String, Features)>,
}

impl Scorer {
    pub fn new(estimator: Box<dyn Estimator>, probe: Arc<dyn SizeProbe>, params: ArmParams) -> Self {
        Self {
            estimator,
            probe,
            params,
            scored: None,
            pending: None,
        }
    }

    fn score(&mut self, url: &str, features: Features) -> f64 {
        self.scored = Some((url_key(url), features));
        self.evaluate(features)
    }

    fn recall(&mut self, url: &str) -> Option<Features> {
        let key = url_key(url);
        match self.scored.take() {
            Some((scored, features)) if scored == key => Some(features),
            _ => None,
        }
    }

    async fn size_feature(&self, url: &str) -> f64 {
        match self.probe.probe_size(url).await {
            Ok(bytes) => bytes as f64 / self.params.max_size as f64,
            Err(e) => {
                debug!("Size unknown for {}: {}", url, e);
                0.0
            }
        }
    }

    fn evaluate(&self, features: Features) -> f64 {
        let [negative, positive] = self.estimator.score(features);
        positive - negative
    }

    /// Keyword frequency minus a size penalty.
    fn response(&self, subject: &str, content: &str, size: u64) -> f64 {
        let mentions = if subject.is_empty() {
            0
        } else {
            content.matches(subject).count()
        };
        mentions as f64 / 100.0 - size as f64 / self.params.max_size as f64
    }

    fn remember(&mut self, url: &str, features: Features) {
        self.pending = Some((url_key(url), features));
    }

    fn train(&mut self, url: &str, subject: &str, content: &str, metric: Metric) -> f64 {
        let response = self.response(subject, content, metric.size);

        let key = url_key(url);
        match self.pending.take() {
            Some((pending, features)) if pending == key => {
                let label = usize::from(response > 0.0);
                let step = self.params.lr * response.abs();
                self.estimator.update(features, label, step);
            }
            other => {
                warn!("No scored context for {}, model left unchanged", key);
                self.pending = other;
            }
        }

        response
    }
}

pub struct ClassifierArm {
    scorer: Scorer,
    oracle: Arc<dyn RelevanceOracle>,
}

impl ClassifierArm {
    pub fn new(scorer: Scorer, oracle: Arc<dyn RelevanceOracle>) -> Self {
        Self { scorer, oracle }
    }

    async fn features(&self, url: &str, subject: &str) -> Features {
        let key = url_key(url);
        let relevance = self.oracle.relevance(&key, subject).unwrap_or_else(|e| {
            debug!("Relevance unknown for {}: {}", key, e);
            0.0
        });
        [relevance, self.scorer.size_feature(url).await]
    }
}

pub struct ConnectorArm {
    scorer: Scorer,
    axis: Axis,
}

impl ConnectorArm {
    pub fn new(scorer: Scorer, axis: Axis) -> Self {
        Self { scorer, axis }
    }

    async fn features(&self, url: &str, log: &GraphLog) -> Features {
        [linkage_score(url, log), self.scorer.size_feature(url).await]
    }
}

/// Standard-normal CDF of the page's in-degree z-score among logged pages.
pub fn linkage_score(url: &str, log: &GraphLog) -> f64 {
    let z = match log.in_degree_stats() {
        Some(stats) if stats.std > 0.0 => (log.linkage(url) as f64 - stats.mean) / stats.std,
        _ => 0.0,
    };
    normal_cdf(z)
}

pub enum Arm {
    Classifier(ClassifierArm),
    Connector(ConnectorArm),
    Lame,
}

impl Arm {
    pub fn classifier(
        estimator: Box<dyn Estimator>,
        probe: Arc<dyn SizeProbe>,
        oracle: Arc<dyn RelevanceOracle>,
        params: ArmParams,
    ) -> Self {
        Arm::Classifier(ClassifierArm::new(
            Scorer::new(estimator, probe, params),
            oracle,
        ))
    }

    pub fn connector(
        estimator: Box<dyn Estimator>,
        probe: Arc<dyn SizeProbe>,
        axis: Axis,
        params: ArmParams,
    ) -> Self {
        Arm::Connector(ConnectorArm::new(Scorer::new(estimator, probe, params), axis))
    }

    pub fn name(&self) -> String {
        match self {
            Arm::Classifier(_) => "classifier".to_string(),
            Arm::Connector(arm) => format!("connector({})", arm.axis),
            Arm::Lame => "lame".to_string(),
        }
    }

    /// The structural direction a connector is evaluated on.
    pub fn axis(&self) -> Option<Axis> {
        match self {
            Arm::Connector(arm) => Some(arm.axis),
            _ => None,
        }
    }

    /// Predicted reward of visiting `url`. The features are kept for a
    /// following `action` on the same page.
    pub async fn estimate(&mut self, url: &str, subject: &str, log: &GraphLog) -> f64 {
        match self {
            Arm::Classifier(arm) => {
                let features = arm.features(url, subject).await;
                arm.scorer.score(url, features)
            }
            Arm::Connector(arm) => {
                let features = arm.features(url, log).await;
                arm.scorer.score(url, features)
            }
            Arm::Lame => 0.0,
        }
    }

    /// Drops features kept by `estimate`.
    pub fn forget(&mut self) {
        match self {
            Arm::Classifier(arm) => arm.scorer.scored = None,
            Arm::Connector(arm) => arm.scorer.scored = None,
            Arm::Lame => {}
        }
    }

    /// Logs `url` (downloading it unless this is the lame arm) and returns
    /// the estimate the decision was based on.
    pub async fn action(&mut self, url: &str, subject: &str, log: &mut GraphLog) -> f64 {
        match self {
            Arm::Classifier(arm) => {
                let features = match arm.scorer.recall(url) {
                    Some(features) => features,
                    None => arm.features(url, subject).await,
                };
                let estimate = arm.scorer.evaluate(features);
                arm.scorer.remember(url, features);
                log.add_node(url, true, NodeProps::with_estimate(estimate))
                    .await;
                estimate
            }
            Arm::Connector(arm) => {
                let features = match arm.scorer.recall(url) {
                    Some(features) => features,
                    None => arm.features(url, log).await,
                };
                let estimate = arm.scorer.evaluate(features);
                arm.scorer.remember(url, features);
                log.add_node(url, true, NodeProps::with_estimate(estimate))
                    .await;
                estimate
            }
            Arm::Lame => {
                log.add_node(url, false, NodeProps::default()).await;
                0.0
            }
        }
    }

    /// True reward of the downloaded `content`; trains the arm's model.
    pub fn reward(&mut self, url: &str, subject: &str, content: &str, metric: Metric) -> f64 {
        match self {
            Arm::Classifier(arm) => arm.scorer.train(url, subject, content, metric),
            Arm::Connector(arm) => arm.scorer.train(url, subject, content, metric),
            Arm::Lame => 0.0,
        }
    }
}

/// Φ(z), via the Abramowitz–Stegun 7.1.26 approximation of erf.
pub fn normal_cdf(z: f64) -> f64 {
    0.5 * (1.0 + erf(z / std::f64::consts::SQRT_2))
}

fn erf(x: f64) -> f64 {
    const A: [f64; 5] = [
        0.254829592,
        -0.284496736,
        1.421413741,
        -1.453152027,
        1.061405429,
    ];
    const P: f64 = 0.3275911;

    if x == 0.0 {
        return 0.0;
    }
    let sign = x.signum();
    let x = x.abs();
    let t = 1.0 / (1.0 + P * x);
    let poly = A.iter().rev().fold(0.0, |acc, a| acc * t + a) * t;
    sign * (1.0 - poly * (-x * x).exp())
}
