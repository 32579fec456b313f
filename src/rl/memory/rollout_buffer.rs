//! Rollout storage
//!
//! Holds one iteration of on-policy experience and derives GAE advantage and
//! return targets from it. Minibatches borrow from the buffer.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// One environment step as seen by the learner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Policy features the action was chosen from
    pub state: Vec<f32>,
    pub action: usize,
    pub reward: f32,
    /// Episode ended with this step
    pub done: bool,
    /// Log probability under the policy that collected it
    pub log_prob: f32,
    /// Critic estimate at `state`
    pub value: f32,
}

impl Transition {
    pub fn new(
        state: Vec<f32>,
        action: usize,
        reward: f32,
        done: bool,
        log_prob: f32,
        value: f32,
    ) -> Self {
        Self {
            state,
            action,
            reward,
            done,
            log_prob,
            value,
        }
    }
}

/// Learning targets for one transition
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Estimate {
    /// Standardized GAE advantage
    pub advantage: f32,
    /// Discounted return target for the critic
    pub ret: f32,
}

/// A transition borrowed from the buffer with its targets
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample<'a> {
    pub transition: &'a Transition,
    pub advantage: f32,
    pub ret: f32,
}

/// Fixed-capacity on-policy experience for a single PPO update
#[derive(Debug)]
pub struct RolloutBuffer {
    capacity: usize,
    steps: Vec<Transition>,
    /// Filled by `finish`; empty while collecting
    estimates: Vec<Estimate>,
}

impl RolloutBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            steps: Vec::with_capacity(capacity),
            estimates: Vec::new(),
        }
    }

    /// Append a step; ignored once the buffer is full
    pub fn push(&mut self, transition: Transition) {
        if !self.is_full() {
            self.steps.push(transition);
        }
    }

    pub fn is_full(&self) -> bool {
        self.steps.len() >= self.capacity
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.steps
    }

    pub fn estimates(&self) -> &[Estimate] {
        &self.estimates
    }

    /// Close the rollout and compute GAE targets.
    ///
    /// `bootstrap` is the critic's value for the state after the last step;
    /// it is ignored when that step ended an episode.
    pub fn finish(&mut self, gamma: f32, gae_lambda: f32, bootstrap: f32) {
        let mut running = 0.0;
        let mut next_value = bootstrap;

        let mut estimates: Vec<Estimate> = self
            .steps
            .iter()
            .rev()
            .map(|step| {
                let carry = if step.done { 0.0 } else { 1.0 };
                let delta = step.reward + gamma * next_value * carry - step.value;
                running = delta + gamma * gae_lambda * carry * running;
                next_value = step.value;

                Estimate {
                    advantage: running,
                    ret: running + step.value,
                }
            })
            .collect();
        estimates.reverse();

        standardize_advantages(&mut estimates);
        self.estimates = estimates;
    }

    /// Shuffled minibatches over the finished rollout
    pub fn minibatches<R: Rng + ?Sized>(&self, batch_size: usize, rng: &mut R) -> Vec<Vec<Sample<'_>>> {
        let mut order: Vec<usize> = (0..self.steps.len()).collect();
        order.shuffle(rng);

        order
            .chunks(batch_size.max(1))
            .map(|chunk| chunk.iter().map(|&i| self.sample(i)).collect())
            .collect()
    }

    fn sample(&self, index: usize) -> Sample<'_> {
        let estimate = self.estimates.get(index).copied().unwrap_or_default();
        Sample {
            transition: &self.steps[index],
            advantage: estimate.advantage,
            ret: estimate.ret,
        }
    }

    pub fn clear(&mut self) {
        self.steps.clear();
        self.estimates.clear();
    }
}

fn standardize_advantages(estimates: &mut [Estimate]) {
    if estimates.len() < 2 {
        return;
    }

    let n = estimates.len() as f32;
    let mean = estimates.iter().map(|e| e.advantage).sum::<f32>() / n;
    let var = estimates
        .iter()
        .map(|e| (e.advantage - mean).powi(2))
        .sum::<f32>()
        / n;
    let std = var.sqrt().max(1e-8);

    for e in estimates.iter_mut() {
        e.advantage = (e.advantage - mean) / std;
    }
}
