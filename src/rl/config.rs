//! RL Configuration
//!
//! Configuration structs for the policy trainer.

use serde::{Deserialize, Serialize};

/// Main RL configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RLConfig {
    /// PPO algorithm configuration
    #[serde(default)]
    pub ppo: PPOConfig,
    /// Training loop configuration
    #[serde(default)]
    pub training: TrainingConfig,
}

/// PPO algorithm hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PPOConfig {
    /// Learning rate
    pub lr: f64,
    /// Discount factor (gamma)
    pub gamma: f32,
    /// GAE lambda
    pub gae_lambda: f32,
    /// PPO clip range
    pub clip_range: f32,
    /// Value function coefficient
    pub vf_coef: f32,
    /// Entropy bonus coefficient
    pub ent_coef: f32,
    /// Number of PPO epochs per update
    pub n_epochs: usize,
    /// Mini-batch size
    pub batch_size: usize,
    /// Target KL divergence for early stopping
    pub target_kl: Option<f32>,
    /// Maximum gradient norm for clipping
    pub max_grad_norm: f32,
}

impl Default for PPOConfig {
    fn default() -> Self {
        Self {
            lr: 3e-4,
            gamma: 0.99,
            gae_lambda: 0.95,
            clip_range: 0.2,
            vf_coef: 0.5,
            ent_coef: 0.01,
            n_epochs: 10,
            batch_size: 64,
            target_kl: Some(0.015),
            max_grad_norm: 0.5,
        }
    }
}

/// Training loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of training iterations to run
    pub iterations: usize,
    /// Environment steps collected per iteration
    pub rollout_steps: usize,
    /// Path for saving checkpoints
    pub checkpoint_dir: String,
    /// Checkpoints kept on disk
    pub max_checkpoints: usize,
    /// Seed for action sampling and minibatch shuffling
    pub seed: Option<u64>,
    /// Parallel rollout workers (0 = rollouts run on the driver)
    pub num_rollout_workers: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            iterations: 10,
            rollout_steps: 512,
            checkpoint_dir: "./checkpoints".to_string(),
            max_checkpoints: 5,
            seed: None,
            num_rollout_workers: 0,
        }
    }
}

impl RLConfig {
    /// Validate configuration values
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !(self.ppo.lr > 0.0 && self.ppo.lr.is_finite()) {
            errors.push("ppo.lr must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&self.ppo.gamma) {
            errors.push("ppo.gamma must be in [0, 1]".to_string());
        }
        if !(0.0..=1.0).contains(&self.ppo.gae_lambda) {
            errors.push("ppo.gae_lambda must be in [0, 1]".to_string());
        }
        if self.ppo.clip_range <= 0.0 {
            errors.push("ppo.clip_range must be positive".to_string());
        }
        if self.ppo.batch_size == 0 {
            errors.push("ppo.batch_size must be at least 1".to_string());
        }
        if self.ppo.n_epochs == 0 {
            errors.push("ppo.n_epochs must be at least 1".to_string());
        }
        if self.training.rollout_steps == 0 {
            errors.push("training.rollout_steps must be at least 1".to_string());
        }
        if self.training.max_checkpoints == 0 {
            errors.push("training.max_checkpoints must be at least 1".to_string());
        }
        if self.training.num_rollout_workers != 0 {
            errors.push(
                "training.num_rollout_workers must be 0 (rollouts run on the driver)".to_string(),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(RLConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validation_collects_all_errors() {
        let mut config = RLConfig::default();
        config.ppo.batch_size = 0;
        config.training.rollout_steps = 0;
        config.training.num_rollout_workers = 2;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
