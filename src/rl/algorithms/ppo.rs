//! Proximal Policy Optimization (PPO)
//!
//! Clipped-surrogate PPO update for the linear actor-critic in
//! [`super::policy`]. Gradients are computed analytically.

use serde::{Deserialize, Serialize};

use super::policy::{dot, softmax, LinearPolicy};
use crate::rl::config::PPOConfig;
use crate::rl::memory::Sample;

/// PPO Training output
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PPOOutput {
    /// Policy loss
    pub policy_loss: f32,
    /// Value loss
    pub value_loss: f32,
    /// Entropy bonus
    pub entropy: f32,
    /// KL divergence (for early stopping)
    pub approx_kl: f32,
    /// Clip fraction (diagnostic)
    pub clip_fraction: f32,
}

impl PPOOutput {
    /// Running mean over minibatch outputs
    pub fn accumulate(&mut self, other: &PPOOutput, count: usize) {
        let w = 1.0 / count as f32;
        self.policy_loss += (other.policy_loss - self.policy_loss) * w;
        self.value_loss += (other.value_loss - self.value_loss) * w;
        self.entropy += (other.entropy - self.entropy) * w;
        self.approx_kl += (other.approx_kl - self.approx_kl) * w;
        self.clip_fraction += (other.clip_fraction - self.clip_fraction) * w;
    }
}

/// PPO Trainer
///
/// Applies gradient steps to a policy from minibatches of rollout samples.
#[derive(Debug, Clone)]
pub struct PPOTrainer {
    /// Configuration
    config: PPOConfig,
    /// Training step counter
    step_count: usize,
}

impl PPOTrainer {
    /// Create a new PPO trainer
    pub fn new(config: PPOConfig) -> Self {
        Self {
            config,
            step_count: 0,
        }
    }

    /// Train on one minibatch of experiences
    pub fn train_step(&mut self, policy: &mut LinearPolicy, batch: &[Sample<'_>]) -> PPOOutput {
        if batch.is_empty() {
            return PPOOutput::default();
        }
        self.step_count += 1;

        let clip = self.config.clip_range;
        let n_actions = policy.num_actions();
        let dim = policy.feature_dim();

        let mut actor_grad = vec![vec![0.0f32; dim]; n_actions];
        let mut critic_grad = vec![0.0f32; dim];
        let mut output = PPOOutput::default();

        for sample in batch {
            let x = &sample.transition.state;
            let action = sample.transition.action;
            let advantage = sample.advantage;

            let probs = softmax(&policy.logits(x));
            let log_probs: Vec<f32> = probs.iter().map(|p| p.max(1e-12).ln()).collect();
            let log_prob = log_probs[action];

            let ratio = (log_prob - sample.transition.log_prob).exp();
            let surr1 = ratio * advantage;
            let surr2 = ratio.clamp(1.0 - clip, 1.0 + clip) * advantage;
            let clipped = surr2 < surr1;

            let entropy: f32 = -probs.iter().zip(&log_probs).map(|(p, lp)| p * lp).sum::<f32>();

            output.policy_loss += -surr1.min(surr2);
            output.entropy += entropy;
            output.approx_kl += sample.transition.log_prob - log_prob;
            if (ratio - 1.0).abs() > clip {
                output.clip_fraction += 1.0;
            }

            for k in 0..n_actions {
                let indicator = if k == action { 1.0 } else { 0.0 };
                // d(-min(surr1, surr2))/dz_k; zero when the clipped branch is active
                let mut g = if clipped {
                    0.0
                } else {
                    -advantage * ratio * (indicator - probs[k])
                };
                // d(-ent_coef * H)/dz_k
                g += self.config.ent_coef * probs[k] * (log_probs[k] + entropy);

                for (j, xj) in x.iter().enumerate() {
                    actor_grad[k][j] += g * xj;
                }
            }

            let value = dot(&policy.critic, x);
            let error = value - sample.ret;
            output.value_loss += 0.5 * error * error;
            for (j, xj) in x.iter().enumerate() {
                critic_grad[j] += self.config.vf_coef * error * xj;
            }
        }

        let n = batch.len() as f32;
        output.policy_loss /= n;
        output.value_loss /= n;
        output.entropy /= n;
        output.approx_kl /= n;
        output.clip_fraction /= n;

        for row in actor_grad.iter_mut() {
            for g in row.iter_mut() {
                *g /= n;
            }
        }
        for g in critic_grad.iter_mut() {
            *g /= n;
        }

        // Global gradient norm clipping
        let norm = actor_grad
            .iter()
            .flatten()
            .chain(critic_grad.iter())
            .map(|g| g * g)
            .sum::<f32>()
            .sqrt();
        let scale = if norm > self.config.max_grad_norm && norm > 0.0 {
            self.config.max_grad_norm / norm
        } else {
            1.0
        };

        let lr = self.config.lr as f32 * scale;
        for (weights, grads) in policy.actor.iter_mut().zip(&actor_grad) {
            for (w, g) in weights.iter_mut().zip(grads) {
                *w -= lr * g;
            }
        }
        for (w, g) in policy.critic.iter_mut().zip(&critic_grad) {
            *w -= lr * g;
        }

        output
    }

    /// Whether the KL target says to stop this update early
    pub fn should_stop_early(&self, approx_kl: f32) -> bool {
        match self.config.target_kl {
            Some(target) => approx_kl > 1.5 * target,
            None => false,
        }
    }

    /// Get training step count
    pub fn step_count(&self) -> usize {
        self.step_count
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rl::memory::Transition;

    fn transition(action: usize, policy: &LinearPolicy) -> Transition {
        let state = vec![0.0, 0.0, 0.0, 1.0];
        let log_prob = policy.probs(&state)[action].ln();
        Transition::new(state, action, 0.0, false, log_prob, 0.0)
    }

    fn sample(transition: &Transition, advantage: f32, ret: f32) -> Sample<'_> {
        Sample {
            transition,
            advantage,
            ret,
        }
    }

    #[test]
    fn test_ppo_trainer_creation() {
        let trainer = PPOTrainer::new(PPOConfig::default());
        assert_eq!(trainer.step_count(), 0);
    }

    #[test]
    fn test_empty_batch_is_noop() {
        let mut trainer = PPOTrainer::new(PPOConfig::default());
        let mut policy = LinearPolicy::new(3, 3);
        let output = trainer.train_step(&mut policy, &[]);

        assert_eq!(trainer.step_count(), 0);
        assert_eq!(output, PPOOutput::default());
    }

    #[test]
    fn test_positive_advantage_raises_action_probability() {
        let config = PPOConfig {
            lr: 0.1,
            ent_coef: 0.0,
            ..Default::default()
        };
        let mut trainer = PPOTrainer::new(config);
        let mut policy = LinearPolicy::new(3, 3);

        let step = transition(1, &policy);
        let batch = vec![sample(&step, 1.0, 0.0)];
        let before = policy.probs(&batch[0].transition.state)[1];
        let output = trainer.train_step(&mut policy, &batch);
        let after = policy.probs(&batch[0].transition.state)[1];

        assert!(after > before);
        assert_eq!(trainer.step_count(), 1);
        // First step is on-policy
        assert!(output.approx_kl.abs() < 1e-6);
        assert_eq!(output.clip_fraction, 0.0);
    }

    #[test]
    fn test_critic_moves_toward_return() {
        let config = PPOConfig {
            lr: 0.1,
            ..Default::default()
        };
        let mut trainer = PPOTrainer::new(config);
        let mut policy = LinearPolicy::new(3, 3);

        let step = transition(0, &policy);
        let batch = vec![sample(&step, 0.0, 2.0)];
        let state = step.state.clone();
        trainer.train_step(&mut policy, &batch);

        let value = policy.value(&state);
        assert!(value > 0.0 && value < 2.0);
    }

    #[test]
    fn test_early_stopping() {
        let trainer = PPOTrainer::new(PPOConfig::default());
        assert!(trainer.should_stop_early(1.0));
        assert!(!trainer.should_stop_early(0.0));

        let no_target = PPOTrainer::new(PPOConfig {
            target_kl: None,
            ..Default::default()
        });
        assert!(!no_target.should_stop_early(1.0));
    }
}
