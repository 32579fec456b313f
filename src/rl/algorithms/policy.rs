//! Linear actor-critic policy
//!
//! A softmax policy and a value baseline, both linear in the normalized
//! observation plus a bias term. Small enough to train on the driver thread
//! and to checkpoint as plain JSON.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Features are clipped to this many standard deviations
const FEATURE_CLIP: f64 = 10.0;

/// Running z-score normalization of raw observations (Welford's algorithm)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureNormalizer {
    count: u64,
    mean: Vec<f64>,
    m2: Vec<f64>,
}

impl FeatureNormalizer {
    pub fn new(dim: usize) -> Self {
        Self {
            count: 0,
            mean: vec![0.0; dim],
            m2: vec![0.0; dim],
        }
    }

    /// Fold one raw observation into the running statistics
    pub fn update(&mut self, obs: &[f32]) {
        self.count += 1;
        let n = self.count as f64;
        for (i, &x) in obs.iter().enumerate().take(self.mean.len()) {
            let x = x as f64;
            let delta = x - self.mean[i];
            self.mean[i] += delta / n;
            self.m2[i] += delta * (x - self.mean[i]);
        }
    }

    /// Standardize an observation with the current statistics
    pub fn normalize(&self, obs: &[f32]) -> Vec<f32> {
        obs.iter()
            .enumerate()
            .take(self.mean.len())
            .map(|(i, &x)| {
                let std = self.std(i);
                ((x as f64 - self.mean[i]) / std).clamp(-FEATURE_CLIP, FEATURE_CLIP) as f32
            })
            .collect()
    }

    fn std(&self, i: usize) -> f64 {
        if self.count < 2 {
            return 1.0;
        }
        let var = self.m2[i] / (self.count - 1) as f64;
        var.sqrt().max(1e-8)
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }
}

/// Numerically stable softmax
pub fn softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    exps.iter().map(|e| e / sum).collect()
}

/// Linear softmax actor with a linear critic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearPolicy {
    /// Actor weights `[num_actions][feature_dim]`
    pub actor: Vec<Vec<f32>>,
    /// Critic weights `[feature_dim]`
    pub critic: Vec<f32>,
    /// Observation statistics
    pub normalizer: FeatureNormalizer,
}

impl LinearPolicy {
    /// Zero-initialized policy (uniform action probabilities)
    pub fn new(obs_dim: usize, num_actions: usize) -> Self {
        let feature_dim = obs_dim + 1;
        Self {
            actor: vec![vec![0.0; feature_dim]; num_actions],
            critic: vec![0.0; feature_dim],
            normalizer: FeatureNormalizer::new(obs_dim),
        }
    }

    pub fn num_actions(&self) -> usize {
        self.actor.len()
    }

    pub fn feature_dim(&self) -> usize {
        self.critic.len()
    }

    /// Update observation statistics
    pub fn observe(&mut self, obs: &[f32]) {
        self.normalizer.update(obs);
    }

    /// Normalized observation followed by a bias term
    pub fn features(&self, obs: &[f32]) -> Vec<f32> {
        let mut features = self.normalizer.normalize(obs);
        features.push(1.0);
        features
    }

    pub fn logits(&self, features: &[f32]) -> Vec<f32> {
        self.actor.iter().map(|w| dot(w, features)).collect()
    }

    pub fn probs(&self, features: &[f32]) -> Vec<f32> {
        softmax(&self.logits(features))
    }

    pub fn value(&self, features: &[f32]) -> f32 {
        dot(&self.critic, features)
    }

    /// Sample an action; returns `(action, log_prob)`
    pub fn sample<R: Rng + ?Sized>(&self, features: &[f32], rng: &mut R) -> (usize, f32) {
        let probs = self.probs(features);
        let draw: f32 = rng.gen();

        let mut cumulative = 0.0;
        let mut action = probs.len() - 1;
        for (i, p) in probs.iter().enumerate() {
            cumulative += p;
            if draw < cumulative {
                action = i;
                break;
            }
        }

        (action, probs[action].max(1e-12).ln())
    }

    /// Most probable action (ties go to the lowest index)
    pub fn greedy(&self, features: &[f32]) -> usize {
        let probs = self.probs(features);
        let mut best = 0;
        for (i, p) in probs.iter().enumerate() {
            if *p > probs[best] {
                best = i;
            }
        }
        best
    }
}

pub(crate) fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
