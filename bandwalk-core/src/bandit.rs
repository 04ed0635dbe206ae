// Bandits choose which arm acts on the next page

use crate::arm::{Arm, Metric};
use crate::error::GraphError;
use crate::graph::GraphLog;
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub const EPSILON: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Policy {
    /// Always arm 0.
    Single,
    /// Greedy on the arms' estimates, uniform with probability `epsilon`.
    EpsilonGreedy { epsilon: f64 },
    /// Uniform until one arm's mean reward beats the other by four Hoeffding
    /// radii, then that arm forever.
    ExploreThenCommit { budget: f64, winner: Option<usize> },
    /// Chooses between the most linked sibling and child of the last page.
    Genealogist { epsilon: f64 },
}

impl Policy {
    pub fn name(&self) -> &'static str {
        match self {
            Policy::Single => "single",
            Policy::EpsilonGreedy { .. } => "lefty",
            Policy::ExploreThenCommit { .. } => "commit",
            Policy::Genealogist { .. } => "genealogist",
        }
    }
}

/// Running reward statistics of one arm.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ArmStats {
    pub runs: usize,
    pub mean: f64,
}

impl ArmStats {
    fn observe(&mut self, reward: f64) {
        self.runs += 1;
        self.mean += (reward - self.mean) / self.runs as f64;
    }
}

pub struct Bandit {
    policy: Policy,
    arms: Vec<Arm>,
    stats: Vec<ArmStats>,
    current_arm: Option<usize>,
    rng: StdRng,
}

impl Bandit {
    fn new(policy: Policy, arms: Vec<Arm>, rng: StdRng) -> Self {
        let stats = vec![ArmStats::default(); arms.len()];
        Self {
            policy,
            arms,
            stats,
            current_arm: None,
            rng,
        }
    }

    pub fn single(classifier: Arm, rng: StdRng) -> Self {
        Self::new(Policy::Single, vec![classifier], rng)
    }

    /// The classifier against doing nothing.
    pub fn epsilon_greedy(classifier: Arm, epsilon: f64, rng: StdRng) -> Self {
        Self::new(
            Policy::EpsilonGreedy { epsilon },
            vec![classifier, Arm::Lame],
            rng,
        )
    }

    pub fn explore_then_commit(first: Arm, second: Arm, budget: f64, rng: StdRng) -> Self {
        Self::new(
            Policy::ExploreThenCommit {
                budget,
                winner: None,
            },
            vec![first, second],
            rng,
        )
    }

    /// `sibling` is consulted for breadth, `child` for depth.
    pub fn genealogist(sibling: Arm, child: Arm, epsilon: f64, rng: StdRng) -> Self {
        Self::new(Policy::Genealogist { epsilon }, vec![sibling, child], rng)
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn arms(&self) -> &[Arm] {
        &self.arms
    }

    pub fn stats(&self) -> &[ArmStats] {
        &self.stats
    }

    pub fn current_arm(&self) -> Option<usize> {
        self.current_arm
    }

    pub fn winner(&self) -> Option<usize> {
        match self.policy {
            Policy::ExploreThenCommit { winner, .. } => winner,
            _ => None,
        }
    }

    fn explores(&mut self, epsilon: f64) -> bool {
        self.rng.random::<f64>() < epsilon
    }

    fn uniform(&mut self) -> usize {
        self.rng.random_range(0..self.arms.len())
    }

    pub async fn pick_arm(&mut self, url: &str, subject: &str, log: &GraphLog) -> usize {
        match self.policy {
            Policy::Single => 0,
            Policy::EpsilonGreedy { epsilon } => {
                if self.explores(epsilon) {
                    return self.uniform();
                }
                let first = self.arms[0].estimate(url, subject, log).await;
                let second = self.arms[1].estimate(url, subject, log).await;
                if first > second { 0 } else { 1 }
            }
            Policy::ExploreThenCommit { budget, winner } => {
                let winner = winner.or_else(|| self.leader(budget));
                if let Some(arm) = winner {
                    if self.winner().is_none() {
                        info!("Committing to {}", self.arms[arm].name());
                    }
                    self.policy = Policy::ExploreThenCommit {
                        budget,
                        winner: Some(arm),
                    };
                    return arm;
                }
                self.uniform()
            }
            // the Genealogist decides in `pop`
            Policy::Genealogist { .. } => self.current_arm.unwrap_or(0),
        }
    }

    /// The arm whose mean leads by more than four confidence radii.
    fn leader(&self, budget: f64) -> Option<usize> {
        let total: usize = self.stats.iter().map(|s| s.runs).sum();
        let radius = (2.0 * budget / (total as f64 + 1.0)).sqrt();
        let (first, second) = (self.stats[0].mean, self.stats[1].mean);

        if first - second > 4.0 * radius {
            Some(0)
        } else if second - first > 4.0 * radius {
            Some(1)
        } else {
            None
        }
    }

    pub async fn action(&mut self, url: &str, subject: &str, log: &mut GraphLog) -> f64 {
        let arm = match self.policy {
            Policy::Genealogist { .. } => self.current_arm.unwrap_or(0),
            _ => self.pick_arm(url, subject, log).await,
        };
        self.current_arm = Some(arm);
        debug!("{} acts on {}", self.arms[arm].name(), url);
        let estimate = self.arms[arm].action(url, subject, log).await;
        for arm in &mut self.arms {
            arm.forget();
        }
        estimate
    }

    pub fn reward(&mut self, url: &str, subject: &str, content: &str, metric: Metric) -> f64 {
        let arm = self.current_arm.unwrap_or(0);
        let reward = self.arms[arm].reward(url, subject, content, metric);
        self.observe(arm, reward);
        reward
    }

    pub fn observe(&mut self, arm: usize, reward: f64) {
        self.stats[arm].observe(reward);
    }

    /// Next URL to visit.
    ///
    /// Every policy but the Genealogist reads the frontier. The Genealogist
    /// looks at the most recently logged page instead and picks between its
    /// most linked sibling and child, fixing the acting arm on the way.
    pub async fn pop(&mut self, log: &mut GraphLog) -> Result<String, GraphError> {
        let Policy::Genealogist { epsilon } = self.policy else {
            return log.pop();
        };

        let Some(current) = log.last_url().map(str::to_string) else {
            self.current_arm = Some(0);
            return log.pop();
        };
        let sibling = log.pick_sibling(&current).ok();
        let child = log.pick_child(&current).ok();

        let (arm, url) = match (sibling, child) {
            (Some(sibling), Some(child)) => {
                let arm = if self.explores(epsilon) {
                    self.uniform()
                } else {
                    let subject = log.subject();
                    let breadth = self.arms[0].estimate(&sibling, subject, log).await;
                    let depth = self.arms[1].estimate(&child, subject, log).await;
                    if breadth > depth { 0 } else { 1 }
                };
                if arm == 0 { (0, sibling) } else { (1, child) }
            }
            (Some(sibling), None) => (0, sibling),
            (None, Some(child)) => (1, child),
            (None, None) => {
                debug!("No sibling or child of {}, falling back to frontier", current);
                self.current_arm = Some(0);
                (0, log.pop()?)
            }
        };

        self.current_arm = Some(arm);
        Ok(url)
    }
}
